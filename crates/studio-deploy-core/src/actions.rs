//! GitHub Actions step outputs and exported variables.
//!
//! Both are appended to the runner's command files (`$GITHUB_OUTPUT`,
//! `$GITHUB_ENV`). Outside a runner the files are unset and writes are skipped.

use crate::env::GithubEnv;
use crate::error::{DeployError, Result};
use crate::io;
use std::path::Path;

const MULTILINE_DELIMITER: &str = "STUDIO_DEPLOY_EOF";

fn command_entry(name: &str, value: &str) -> Result<String> {
    if name.is_empty() || name.contains('=') || name.contains('\n') {
        return Err(DeployError::InvalidInput(format!(
            "'{name}' is not a valid output or variable name"
        )));
    }
    if value.contains('\n') {
        if value.lines().any(|l| l == MULTILINE_DELIMITER) {
            return Err(DeployError::InvalidInput(format!(
                "value of '{name}' contains the reserved delimiter"
            )));
        }
        Ok(format!(
            "{name}<<{MULTILINE_DELIMITER}\n{value}\n{MULTILINE_DELIMITER}\n"
        ))
    } else {
        Ok(format!("{name}={value}\n"))
    }
}

fn append_entry(file: Option<&Path>, kind: &str, name: &str, value: &str) -> Result<()> {
    let entry = command_entry(name, value)?;
    match file {
        Some(path) => {
            io::append_text(path, &entry)?;
            tracing::debug!(kind, name, "recorded");
        }
        None => tracing::debug!(kind, name, "not running in actions, skipped"),
    }
    Ok(())
}

pub fn set_output(env: &GithubEnv, name: &str, value: &str) -> Result<()> {
    append_entry(env.output_file.as_deref(), "output", name, value)
}

/// Make `name=value` visible to later workflow steps.
pub fn export_variable(env: &GithubEnv, name: &str, value: &str) -> Result<()> {
    append_entry(env.env_file.as_deref(), "variable", name, value)
}

/// Parse `KEY=VALUE` lines. Blank lines are skipped; the value keeps any
/// further `=`. Lines without `=` or with an empty key are ignored.
pub fn parse_env_assignments(raw: &str) -> Vec<(String, String)> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                tracing::debug!(line, "ignoring assignment without a key");
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}
