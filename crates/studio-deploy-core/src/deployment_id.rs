//! Deterministic preview identifiers.
//!
//! A deployment id is `<studioHost>--<branch>` and ends up as a subdomain
//! label (`<id>.sanity.studio`), so it must fit the 63-byte DNS label limit
//! and only contain `[a-z0-9-]` after the host.

use crate::config_file;
use crate::env::GithubEnv;
use crate::error::{DeployError, Result};
use serde::Serialize;
use std::path::Path;

pub const MAX_URL_PART_LENGTH: usize = 63;
/// The branch part must keep more than this many characters.
pub const MIN_BRANCH_URL_PART: usize = 8;
pub const TRUNK_BRANCHES: [&str; 2] = ["main", "master"];

const SEPARATOR: &str = "--";

/// Lower-case `branch` and reduce it to `[a-z0-9-]`, with no leading, trailing
/// or repeated `-`, at most `max_len` characters long.
pub fn sanitize_branch_name(branch: &str, max_len: usize) -> String {
    let mut name = String::with_capacity(branch.len());
    for c in branch.to_lowercase().chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '-'
        };
        if c == '-' && name.ends_with('-') {
            continue;
        }
        name.push(c);
    }

    // Only ASCII survives the loop above, so byte slicing is safe.
    let name = name.trim_matches('-');
    let truncated = &name[..name.len().min(max_len)];
    truncated.trim_end_matches('-').to_string()
}

pub fn build_deployment_id(host: &str, branch: &str) -> Result<String> {
    if host.is_empty() {
        return Err(DeployError::InvalidInput(
            "host is required to build a deployment id".to_string(),
        ));
    }
    if branch.is_empty() {
        return Err(DeployError::InvalidInput(
            "branch name is required to build a deployment id".to_string(),
        ));
    }

    let branch_len = MAX_URL_PART_LENGTH.saturating_sub(SEPARATOR.len() + host.len());
    if branch_len <= MIN_BRANCH_URL_PART {
        return Err(DeployError::HostTooLong {
            host: host.to_string(),
        });
    }

    let sanitized = sanitize_branch_name(branch, branch_len);
    if sanitized.is_empty() {
        return Err(DeployError::InvalidInput(format!(
            "branch '{branch}' has no characters usable in a deployment id"
        )));
    }

    let id = format!("{host}{SEPARATOR}{sanitized}");
    if id.len() > MAX_URL_PART_LENGTH {
        return Err(DeployError::HostTooLong {
            host: host.to_string(),
        });
    }
    Ok(id)
}

/// Build the preview id for the current branch from the configured `studioHost`.
pub fn generate_deployment_id(root: &Path, env: &GithubEnv) -> Result<String> {
    let branch = env.current_branch().ok_or_else(|| {
        DeployError::EnvironmentIncomplete(
            "could not determine the current branch from GITHUB_HEAD_REF or GITHUB_REF"
                .to_string(),
        )
    })?;
    if TRUNK_BRANCHES.contains(&branch) {
        return Err(DeployError::TrunkBranch(branch.to_string()));
    }

    let host = config_file::studio_host(root)?;
    build_deployment_id(&host, branch)
}

// ---------------------------------------------------------------------------
// DeploymentContext
// ---------------------------------------------------------------------------

/// Whether this run deploys a preview, and under which id. Resolved once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeploymentContext {
    pub is_pull_request: bool,
    pub deployment_id: Option<String>,
}

impl DeploymentContext {
    pub fn resolve(root: &Path, env: &GithubEnv) -> Result<Self> {
        if !env.is_pull_request() {
            return Ok(Self::default());
        }
        let deployment_id = generate_deployment_id(root, env)?;
        tracing::info!(deployment_id = %deployment_id, "resolved preview deployment id");
        Ok(Self {
            is_pull_request: true,
            deployment_id: Some(deployment_id),
        })
    }

    /// The preview id, only in a pull-request run.
    pub fn preview_id(&self) -> Option<&str> {
        if self.is_pull_request {
            self.deployment_id.as_deref()
        } else {
            None
        }
    }

    /// GitHub environment name for a deployment of `kind` (`studio`, `graphql`).
    pub fn environment(&self, kind: &str) -> String {
        if self.is_pull_request {
            format!("preview-{kind}")
        } else {
            kind.to_string()
        }
    }
}

// ---------------------------------------------------------------------------
// DeploymentUrls
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentUrls {
    pub studio: String,
    pub graphql: String,
    pub graphql_playground: String,
}

impl DeploymentUrls {
    pub fn new(deployment_id: &str, project_id: &str, dataset: &str) -> Self {
        let graphql =
            format!("https://{project_id}.api.sanity.io/v1/graphql/{dataset}/{deployment_id}");
        Self {
            studio: format!("https://{deployment_id}.sanity.studio"),
            graphql_playground: format!("{graphql}/playground"),
            graphql,
        }
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

    fn assert_label_shape(s: &str) {
        assert!(
            s.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
            "bad character in {s:?}"
        );
        assert!(!s.starts_with('-') && !s.ends_with('-'), "edge dash in {s:?}");
        assert!(!s.contains("--"), "doubled dash in {s:?}");
    }

    #[test]
    fn sanitize_examples() {
        assert_eq!(sanitize_branch_name("feature/ABC-123!!", 50), "feature-abc-123");
        assert_eq!(sanitize_branch_name("--Fix__the  Bug--", 50), "fix-the-bug");
        assert_eq!(sanitize_branch_name("dependabot/npm_and_yarn/sanity-3.2.1", 50), "dependabot-npm-and-yarn-sanity-3-2-1");
        assert_eq!(sanitize_branch_name("", 10), "");
        assert_eq!(sanitize_branch_name("!!!", 10), "");
        assert_eq!(sanitize_branch_name("Ünïcödé-branch", 50), "n-c-d-branch");
    }

    #[test]
    fn sanitize_truncates_without_trailing_dash() {
        assert_eq!(sanitize_branch_name("abc-def", 4), "abc");
        assert_eq!(sanitize_branch_name("abcdefgh", 3), "abc");
        assert_eq!(sanitize_branch_name("abc", 0), "");
    }

    #[test]
    fn sanitize_properties_hold_for_assorted_inputs() {
        let inputs = [
            "feature/ABC-123!!",
            "-a-b-",
            "a///b",
            "UPPER_lower 42",
            "🚀rocket-branch",
            "renovate/@sanity/ui-2.x",
            "x",
            "---",
        ];
        for input in inputs {
            for max in [0, 1, 3, 8, 20, 61] {
                let out = sanitize_branch_name(input, max);
                assert!(out.len() <= max, "{out:?} longer than {max}");
                assert_label_shape(&out);
            }
        }
    }

    #[test]
    fn build_example() {
        assert_eq!(
            build_deployment_id("myproj", "feature/ABC-123!!").unwrap(),
            "myproj--feature-abc-123"
        );
    }

    #[test]
    fn build_is_deterministic_and_bounded() {
        let long_branch = "feature/".to_string() + &"very-long-branch-name-".repeat(10);
        for host in ["a", "movies", "a-reasonably-long-studio-host-name-here"] {
            let first = build_deployment_id(host, &long_branch).unwrap();
            let second = build_deployment_id(host, &long_branch).unwrap();
            assert_eq!(first, second);
            assert!(first.len() <= MAX_URL_PART_LENGTH, "{first} too long");
            assert!(first.starts_with(&format!("{host}--")));
        }
    }

    #[test]
    fn host_length_boundary() {
        let ok_host = "h".repeat(52);
        let id = build_deployment_id(&ok_host, "feature-branch").unwrap();
        assert_eq!(id, format!("{ok_host}--feature-b"));
        assert_eq!(id.len(), 63);

        let long_host = "h".repeat(53);
        assert!(matches!(
            build_deployment_id(&long_host, "feature-branch"),
            Err(DeployError::HostTooLong { .. })
        ));
    }

    #[test]
    fn overlong_host_is_rejected() {
        assert!(matches!(
            build_deployment_id("a-host-that-is-way-too-long-for-any-reasonable-label-use", "main"),
            Err(DeployError::HostTooLong { .. })
        ));
    }

    #[test]
    fn empty_inputs_are_rejected() {
        assert!(matches!(
            build_deployment_id("", "branch"),
            Err(DeployError::InvalidInput(_))
        ));
        assert!(matches!(
            build_deployment_id("host", ""),
            Err(DeployError::InvalidInput(_))
        ));
        assert!(matches!(
            build_deployment_id("host", "!!!"),
            Err(DeployError::InvalidInput(_))
        ));
    }

    fn env_of(pairs: &[(&str, &str)]) -> GithubEnv {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GithubEnv::from_lookup(|key| vars.get(key).cloned())
    }

    fn studio_with_host(host: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("sanity.cli.ts"),
            format!("export default defineCliConfig({{studioHost: '{host}'}})\n"),
        )
        .unwrap();
        dir
    }

    #[test]
    fn generate_uses_config_host_and_head_branch() {
        let dir = studio_with_host("movies");
        let env = env_of(&[
            ("GITHUB_EVENT_NAME", "pull_request"),
            ("GITHUB_HEAD_REF", "Feature/Posters"),
        ]);
        assert_eq!(
            generate_deployment_id(dir.path(), &env).unwrap(),
            "movies--feature-posters"
        );
    }

    #[test]
    fn generate_refuses_trunk_branches() {
        let dir = studio_with_host("movies");
        for trunk in TRUNK_BRANCHES {
            let git_ref = format!("refs/heads/{trunk}");
            let env = env_of(&[("GITHUB_EVENT_NAME", "push"), ("GITHUB_REF", &git_ref)]);
            assert!(matches!(
                generate_deployment_id(dir.path(), &env),
                Err(DeployError::TrunkBranch(_))
            ));
        }
    }

    #[test]
    fn generate_requires_a_branch() {
        let dir = studio_with_host("movies");
        assert!(matches!(
            generate_deployment_id(dir.path(), &env_of(&[])),
            Err(DeployError::EnvironmentIncomplete(_))
        ));
    }

    #[test]
    fn context_outside_pull_request_has_no_id() {
        let dir = TempDir::new().unwrap();
        let ctx = DeploymentContext::resolve(dir.path(), &env_of(&[("GITHUB_EVENT_NAME", "push")]))
            .unwrap();
        assert_eq!(ctx, DeploymentContext::default());
        assert_eq!(ctx.preview_id(), None);
        assert_eq!(ctx.environment("studio"), "studio");
    }

    #[test]
    fn context_in_pull_request_carries_id() {
        let dir = studio_with_host("movies");
        let env = env_of(&[
            ("GITHUB_EVENT_NAME", "pull_request"),
            ("GITHUB_HEAD_REF", "fix-42"),
        ]);
        let ctx = DeploymentContext::resolve(dir.path(), &env).unwrap();
        assert!(ctx.is_pull_request);
        assert_eq!(ctx.preview_id(), Some("movies--fix-42"));
        assert_eq!(ctx.environment("graphql"), "preview-graphql");
    }

    #[test]
    fn urls_for_preview() {
        let urls = DeploymentUrls::new("movies--fix-42", "abc123", "production");
        assert_eq!(urls.studio, "https://movies--fix-42.sanity.studio");
        assert_eq!(
            urls.graphql,
            "https://abc123.api.sanity.io/v1/graphql/production/movies--fix-42"
        );
        assert_eq!(
            urls.graphql_playground,
            "https://abc123.api.sanity.io/v1/graphql/production/movies--fix-42/playground"
        );
    }
}
