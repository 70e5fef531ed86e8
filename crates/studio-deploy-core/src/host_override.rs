//! Pointing a studio config at a preview host.
//!
//! A preview host and an `appId` binding are mutually exclusive for the Sanity
//! CLI, so every override also strips `appId` from the deployment settings.
//! A backup of the untouched config is always written before anything else.
//!
//! For `sanity.cli.*` sources the edit is plain text surgery: the `studioHost`
//! value is swapped in place and `appId` bindings are removed by four regex
//! passes applied in a fixed order. This is best effort. Configs that build
//! these values dynamically are not rewritten.

use crate::config_file::{ConfigFile, Dialect};
use crate::error::{DeployError, Result};
use crate::{io, paths};
use chrono::Utc;
use regex::{Captures, Regex};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Where an override landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOverride {
    pub config: PathBuf,
    pub backup: PathBuf,
}

/// Override `studioHost` in the config under `root` and drop stale `appId`s.
///
/// The original is copied to `<config>.<epoch>.bak` first. On any parse or
/// match failure the original is left untouched.
pub fn override_host(root: &Path, new_host: &str) -> Result<HostOverride> {
    let config = ConfigFile::require(root)?;
    if new_host.is_empty() {
        return Err(DeployError::InvalidInput(
            "a new studio host is required to override studioHost".to_string(),
        ));
    }

    let original = config.read()?;
    let backup = paths::backup_path(&config.path, Utc::now().timestamp());
    std::fs::write(&backup, &original)?;
    tracing::debug!(backup = %backup.display(), "backed up Sanity CLI config");

    let updated = config.dialect.override_host(&config.path, &original, new_host)?;
    io::atomic_write(&config.path, updated.as_bytes())?;

    tracing::info!(
        config = %config.path.display(),
        host = %new_host,
        "studioHost overridden"
    );
    Ok(HostOverride {
        config: config.path,
        backup,
    })
}

impl Dialect {
    /// Produce the rewritten config text. `path` is only used for errors.
    pub fn override_host(self, path: &Path, content: &str, new_host: &str) -> Result<String> {
        match self {
            Dialect::Structured => override_structured(path, content, new_host),
            Dialect::ScriptLike => override_script(path, content, new_host),
        }
    }
}

// ---------------------------------------------------------------------------
// Structured (sanity.json)
// ---------------------------------------------------------------------------

fn override_structured(path: &Path, content: &str, new_host: &str) -> Result<String> {
    let malformed = |message: String| DeployError::MalformedConfig {
        path: path.to_path_buf(),
        message,
    };

    let mut config: Value = serde_json::from_str(content).map_err(|e| malformed(e.to_string()))?;
    let root = config
        .as_object_mut()
        .ok_or_else(|| malformed("expected a JSON object at the top level".to_string()))?;

    root.insert("studioHost".to_string(), Value::String(new_host.to_string()));
    if let Some(deployment) = root.get_mut("deployment").and_then(Value::as_object_mut) {
        deployment.shift_remove("appId");
    }
    if let Some(deployment) = root
        .get_mut("project")
        .and_then(|project| project.get_mut("deployment"))
        .and_then(Value::as_object_mut)
    {
        deployment.shift_remove("appId");
    }

    let mut serialized = serde_json::to_string_pretty(&config)?;
    if content.ends_with('\n') {
        serialized.push('\n');
    }
    Ok(serialized)
}

// ---------------------------------------------------------------------------
// Script-like (sanity.cli.*)
// ---------------------------------------------------------------------------

/// A single-, double- or backtick-quoted literal without nested quotes.
const QUOTED: &str = r#"(?:'[^'"`]*'|"[^'"`]*"|`[^'"`]*`)"#;

static HOST_RE: OnceLock<Regex> = OnceLock::new();
static INLINE_DEPLOYMENT_RE: OnceLock<Regex> = OnceLock::new();
static APP_ID_LINE_RE: OnceLock<Regex> = OnceLock::new();
static LEADING_APP_ID_RE: OnceLock<Regex> = OnceLock::new();
static TRAILING_APP_ID_RE: OnceLock<Regex> = OnceLock::new();

fn host_re() -> &'static Regex {
    HOST_RE.get_or_init(|| {
        Regex::new(r#"(['"`]?\bstudioHost\b['"`]?\s*:\s*)(['"`])([^'"`]+)(['"`])"#)
            .expect("studioHost pattern is valid")
    })
}

fn inline_deployment_re() -> &'static Regex {
    INLINE_DEPLOYMENT_RE.get_or_init(|| {
        Regex::new(&format!(
            r"(^|\s)deployment\s*:\s*\{{\s*appId\s*:\s*{QUOTED}\s*\}}"
        ))
        .expect("inline deployment pattern is valid")
    })
}

fn app_id_line_re() -> &'static Regex {
    APP_ID_LINE_RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?m)(^|\n)[ \t]*appId\s*:\s*{QUOTED}\s*,?[ \t]*\r?\n"
        ))
        .expect("appId line pattern is valid")
    })
}

fn leading_app_id_re() -> &'static Regex {
    LEADING_APP_ID_RE.get_or_init(|| {
        Regex::new(&format!(r"(\{{\s*)appId\s*:\s*{QUOTED}\s*,\s*"))
            .expect("leading appId pattern is valid")
    })
}

fn trailing_app_id_re() -> &'static Regex {
    TRAILING_APP_ID_RE.get_or_init(|| {
        Regex::new(&format!(r",\s*appId\s*:\s*{QUOTED}"))
            .expect("trailing appId pattern is valid")
    })
}

fn override_script(path: &Path, content: &str, new_host: &str) -> Result<String> {
    if !host_re().is_match(content) {
        return Err(DeployError::MissingField {
            field: "studioHost".to_string(),
            path: path.to_path_buf(),
        });
    }

    let with_host = host_re().replacen(content, 1, |caps: &Captures| {
        format!("{}{}{}{}", &caps[1], &caps[2], new_host, &caps[4])
    });

    let mut cleaned = remove_app_id(&with_host);
    if content.ends_with('\n') && !cleaned.ends_with('\n') {
        cleaned.push('\n');
    }
    Ok(cleaned)
}

/// Strip `appId` bindings. Passes run in order; later ones expect the shapes
/// earlier ones leave behind.
fn remove_app_id(content: &str) -> String {
    // deployment: { appId: 'x' }  ->  deployment: { }
    let updated = inline_deployment_re().replace_all(content, "${1}deployment: { }");
    // a whole `appId: 'x',` line
    let updated = app_id_line_re().replace_all(&updated, "${1}");
    // { appId: 'x', other }  ->  { other }
    let updated = leading_app_id_re().replace_all(&updated, "${1}");
    // { other, appId: 'x' }  ->  { other }
    let updated = trailing_app_id_re().replace_all(&updated, "");
    updated.into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
