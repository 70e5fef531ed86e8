//! Typed view over the GitHub Actions runtime environment.

use crate::error::{DeployError, Result};
use crate::github::RepoRef;
use serde_json::Value;
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const PULL_REQUEST_EVENTS: [&str; 2] = ["pull_request", "pull_request_target"];

/// Snapshot of the `GITHUB_*` variables a pipeline run depends on.
/// Empty values are treated as unset.
#[derive(Debug, Clone, Default)]
pub struct GithubEnv {
    pub event_name: Option<String>,
    pub head_ref: Option<String>,
    pub git_ref: Option<String>,
    pub repository: Option<String>,
    pub repository_owner: Option<String>,
    pub sha: Option<String>,
    pub event_path: Option<PathBuf>,
    pub pr_number: Option<String>,
    pub token: Option<String>,
    pub api_url: Option<String>,
    pub output_file: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

impl GithubEnv {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            event_name: get("GITHUB_EVENT_NAME"),
            head_ref: get("GITHUB_HEAD_REF"),
            git_ref: get("GITHUB_REF"),
            repository: get("GITHUB_REPOSITORY"),
            repository_owner: get("GITHUB_REPOSITORY_OWNER"),
            sha: get("GITHUB_SHA"),
            event_path: get("GITHUB_EVENT_PATH").map(PathBuf::from),
            pr_number: get("PR_NUMBER"),
            token: get("GITHUB_TOKEN"),
            api_url: get("GITHUB_API_URL"),
            output_file: get("GITHUB_OUTPUT").map(PathBuf::from),
            env_file: get("GITHUB_ENV").map(PathBuf::from),
        }
    }

    pub fn is_pull_request(&self) -> bool {
        self.event_name
            .as_deref()
            .is_some_and(|e| PULL_REQUEST_EVENTS.contains(&e))
    }

    /// Head branch on PR events, otherwise the pushed branch from `GITHUB_REF`.
    pub fn current_branch(&self) -> Option<&str> {
        if self.is_pull_request() {
            if let Some(head) = self.head_ref.as_deref() {
                return Some(head);
            }
        }
        self.git_ref
            .as_deref()
            .and_then(|r| r.strip_prefix("refs/heads/"))
            .filter(|b| !b.is_empty())
    }

    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub fn repo(&self) -> Result<RepoRef> {
        let repository = self.repository.as_deref().unwrap_or_default();
        let (repo_owner, name) = repository.split_once('/').unwrap_or(("", repository));
        if name.is_empty() {
            return Err(DeployError::EnvironmentIncomplete(
                "missing repository metadata: ensure GITHUB_REPOSITORY is set".to_string(),
            ));
        }
        let owner = self.repository_owner.as_deref().unwrap_or(repo_owner);
        if owner.is_empty() {
            return Err(DeployError::EnvironmentIncomplete(
                "missing repository metadata: ensure GITHUB_REPOSITORY_OWNER is set".to_string(),
            ));
        }
        Ok(RepoRef::new(owner, name))
    }

    pub fn sha(&self) -> Result<&str> {
        self.sha.as_deref().ok_or_else(|| {
            DeployError::EnvironmentIncomplete(
                "missing repository metadata: ensure GITHUB_SHA is set".to_string(),
            )
        })
    }

    /// `PR_NUMBER` if set, otherwise the number in the PR event payload.
    pub fn pull_request_number(&self) -> Result<u64> {
        if let Some(n) = self
            .pr_number
            .as_deref()
            .and_then(|s| s.trim().parse::<u64>().ok())
        {
            return Ok(n);
        }

        if !self.is_pull_request() {
            return Err(DeployError::EnvironmentIncomplete(
                "this workflow did not run in a pull request context".to_string(),
            ));
        }

        let path = self.event_path.as_ref().ok_or_else(|| {
            DeployError::EnvironmentIncomplete("GITHUB_EVENT_PATH is not defined".to_string())
        })?;
        let payload_error = |e: &dyn std::fmt::Display| {
            DeployError::EnvironmentIncomplete(format!("failed to read pull request payload: {e}"))
        };
        let raw = std::fs::read_to_string(path).map_err(|e| payload_error(&e))?;
        let payload: Value = serde_json::from_str(&raw).map_err(|e| payload_error(&e))?;

        payload
            .get("number")
            .and_then(Value::as_u64)
            .or_else(|| payload.pointer("/pull_request/number").and_then(Value::as_u64))
            .ok_or_else(|| {
                DeployError::EnvironmentIncomplete(
                    "could not determine pull request number from event payload".to_string(),
                )
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> GithubEnv {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GithubEnv::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn detects_pull_request_events() {
        assert!(env_of(&[("GITHUB_EVENT_NAME", "pull_request")]).is_pull_request());
        assert!(env_of(&[("GITHUB_EVENT_NAME", "pull_request_target")]).is_pull_request());
        assert!(!env_of(&[("GITHUB_EVENT_NAME", "push")]).is_pull_request());
        assert!(!env_of(&[]).is_pull_request());
    }

    #[test]
    fn branch_from_head_ref_on_pr() {
        let env = env_of(&[
            ("GITHUB_EVENT_NAME", "pull_request"),
            ("GITHUB_HEAD_REF", "feature/login"),
            ("GITHUB_REF", "refs/pull/7/merge"),
        ]);
        assert_eq!(env.current_branch(), Some("feature/login"));
    }

    #[test]
    fn branch_from_ref_on_push() {
        let env = env_of(&[
            ("GITHUB_EVENT_NAME", "push"),
            ("GITHUB_HEAD_REF", ""),
            ("GITHUB_REF", "refs/heads/release/2.0"),
        ]);
        assert_eq!(env.current_branch(), Some("release/2.0"));
        assert_eq!(env_of(&[("GITHUB_REF", "refs/tags/v1")]).current_branch(), None);
    }

    #[test]
    fn repo_details() {
        let env = env_of(&[("GITHUB_REPOSITORY", "sanity-io/movies"), ("GITHUB_SHA", "abc")]);
        assert_eq!(env.repo().unwrap(), RepoRef::new("sanity-io", "movies"));
        assert_eq!(env.sha().unwrap(), "abc");

        assert!(matches!(
            env_of(&[]).repo(),
            Err(DeployError::EnvironmentIncomplete(_))
        ));
        assert!(env_of(&[]).sha().is_err());
    }

    #[test]
    fn pr_number_from_variable() {
        assert_eq!(env_of(&[("PR_NUMBER", "42")]).pull_request_number().unwrap(), 42);
    }

    #[test]
    fn pr_number_from_event_payload() {
        let dir = TempDir::new().unwrap();
        let event = dir.path().join("event.json");

        std::fs::write(&event, r#"{"number": 17}"#).unwrap();
        let env = env_of(&[
            ("GITHUB_EVENT_NAME", "pull_request"),
            ("GITHUB_EVENT_PATH", event.to_str().unwrap()),
        ]);
        assert_eq!(env.pull_request_number().unwrap(), 17);

        std::fs::write(&event, r#"{"pull_request": {"number": 23}}"#).unwrap();
        assert_eq!(env.pull_request_number().unwrap(), 23);

        std::fs::write(&event, r#"{"action": "opened"}"#).unwrap();
        assert!(env.pull_request_number().is_err());
    }

    #[test]
    fn pr_number_requires_pr_context() {
        let err = env_of(&[("GITHUB_EVENT_NAME", "push")])
            .pull_request_number()
            .unwrap_err();
        assert!(matches!(err, DeployError::EnvironmentIncomplete(_)));

        let err = env_of(&[("GITHUB_EVENT_NAME", "pull_request")])
            .pull_request_number()
            .unwrap_err();
        assert!(err.to_string().contains("GITHUB_EVENT_PATH"));
    }
}
