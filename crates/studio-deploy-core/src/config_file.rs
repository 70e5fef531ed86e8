//! Locating and reading the Sanity CLI config of a studio project.
//!
//! A project root holds at most one authoritative config. It is either a
//! `sanity.cli.{ts,js,mjs}` source file or a legacy `sanity.json`. The dialect
//! is decided once from the file extension when the config is located.

use crate::error::{DeployError, Result};
use crate::paths::CONFIG_CANDIDATES;
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Dialect
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `sanity.json`: a JSON object tree.
    Structured,
    /// `sanity.cli.*`: free-form source with `key: 'value'` assignments.
    ScriptLike,
}

impl Dialect {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Dialect::Structured,
            _ => Dialect::ScriptLike,
        }
    }
}

// ---------------------------------------------------------------------------
// ConfigFile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub dialect: Dialect,
}

/// Return the first recognized config file in `root`, or `None`.
pub fn find_config(root: &Path) -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

impl ConfigFile {
    pub fn locate(root: &Path) -> Option<Self> {
        find_config(root).map(|path| Self {
            dialect: Dialect::from_path(&path),
            path,
        })
    }

    /// Locate the config or fail with [`DeployError::ConfigNotFound`].
    pub fn require(root: &Path) -> Result<Self> {
        Self::locate(root).ok_or_else(|| DeployError::ConfigNotFound(root.to_path_buf()))
    }

    pub fn read(&self) -> Result<String> {
        Ok(std::fs::read_to_string(&self.path)?)
    }

    /// The declared `studioHost`, if any.
    pub fn studio_host(&self) -> Result<Option<String>> {
        let content = self.read()?;
        match self.dialect {
            Dialect::Structured => {
                let config = self.parse_json(&content)?;
                Ok(config
                    .get("studioHost")
                    .and_then(Value::as_str)
                    .map(str::to_string))
            }
            Dialect::ScriptLike => Ok(capture_assignment(studio_host_re(), &content)),
        }
    }

    /// The declared dataset (`api.dataset` in `sanity.json`).
    pub fn dataset(&self) -> Result<Option<String>> {
        let content = self.read()?;
        match self.dialect {
            Dialect::Structured => {
                let config = self.parse_json(&content)?;
                Ok(config
                    .pointer("/api/dataset")
                    .and_then(Value::as_str)
                    .map(str::to_string))
            }
            Dialect::ScriptLike => Ok(capture_assignment(dataset_re(), &content)),
        }
    }

    pub(crate) fn parse_json(&self, content: &str) -> Result<Value> {
        serde_json::from_str(content).map_err(|e| DeployError::MalformedConfig {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }
}

/// Read `studioHost` from the config in `root`.
pub fn studio_host(root: &Path) -> Result<String> {
    let config = ConfigFile::require(root)?;
    config
        .studio_host()?
        .filter(|h| !h.is_empty())
        .ok_or(DeployError::MissingField {
            field: "studioHost".to_string(),
            path: config.path,
        })
}

/// Read the dataset from the config in `root`.
pub fn dataset(root: &Path) -> Result<String> {
    let config = ConfigFile::require(root)?;
    config
        .dataset()?
        .filter(|d| !d.is_empty())
        .ok_or(DeployError::MissingField {
            field: "dataset".to_string(),
            path: config.path,
        })
}

// ---------------------------------------------------------------------------
// Script-like value extraction
// ---------------------------------------------------------------------------

static STUDIO_HOST_RE: OnceLock<Regex> = OnceLock::new();
static DATASET_RE: OnceLock<Regex> = OnceLock::new();

fn studio_host_re() -> &'static Regex {
    STUDIO_HOST_RE.get_or_init(|| assignment_re("studioHost"))
}

fn dataset_re() -> &'static Regex {
    DATASET_RE.get_or_init(|| assignment_re("dataset"))
}

/// `key: 'value'`, with the key optionally quoted.
fn assignment_re(key: &str) -> Regex {
    let pattern = format!(
        r#"['"`]?\b{}\b['"`]?\s*:\s*['"`]([^'"`]+)['"`]"#,
        regex::escape(key)
    );
    Regex::new(&pattern).expect("assignment pattern is valid")
}

fn capture_assignment(re: &Regex, content: &str) -> Option<String> {
    re.captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
