//! Shared state and steps of the `build-deploy` and `cleanup` runs.
//!
//! GitHub reporting (commit status, deployment records, the PR comment) is
//! best effort: failures are logged and the run carries on.

use anyhow::Context;
use chrono::Utc;
use clap::Args;
use std::path::{Path, PathBuf};
use std::time::Duration;
use studio_deploy_core::{
    actions,
    deployment_id::DeploymentContext,
    env::GithubEnv,
    github::{CommitState, DeploymentState, GithubClient},
    reconcile,
    report::{render_report, DeploymentReport},
    sanity_cli::{self, GraphqlOptions, SanityCli},
    workspace::{self, PackageManager},
};

pub const STATUS_CONTEXT: &str = "sanity/preview";
pub const PACKAGE_MANAGER_VAR: &str = "SANITY_PACKAGE_MANAGER";
const AUTH_TOKEN_VAR: &str = "SANITY_AUTH_TOKEN";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Inputs shared by build-deploy and cleanup
// ---------------------------------------------------------------------------

#[derive(Args, Debug, Clone)]
pub struct SetupArgs {
    /// Sanity auth token, exported as SANITY_AUTH_TOKEN
    #[arg(long, env = "INPUT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Extra KEY=VALUE lines exported to the sanity CLI and later steps
    #[arg(long, env = "INPUT_ENVIRONMENT_VARIABLES", default_value = "")]
    pub environment_variables: String,

    /// @sanity/cli version to install
    #[arg(long, env = "INPUT_CLI_VERSION", default_value = "latest")]
    pub cli_version: String,
}

#[derive(Args, Debug, Clone)]
pub struct GraphqlTargetArgs {
    /// GraphQL API tag (default: the deployment id on pull requests)
    #[arg(long, env = "INPUT_GRAPHQL_OVERRIDE_TAG")]
    pub graphql_override_tag: Option<String>,

    /// GraphQL dataset (default: from the Sanity CLI config)
    #[arg(long, env = "INPUT_GRAPHQL_OVERRIDE_DATASET")]
    pub graphql_override_dataset: Option<String>,
}

impl GraphqlTargetArgs {
    pub fn options(&self) -> GraphqlOptions {
        GraphqlOptions {
            override_tag: non_empty(self.graphql_override_tag.as_deref()),
            dataset: non_empty(self.graphql_override_dataset.as_deref()),
            ..Default::default()
        }
    }
}

/// Actions passes unset inputs as empty strings.
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    pub root: PathBuf,
    pub env: GithubEnv,
    pub github: Option<GithubClient>,
    pub http: reqwest::Client,
    /// Variables passed to every child process.
    pub child_env: Vec<(String, String)>,
}

impl Pipeline {
    pub fn new(root: &Path, env: GithubEnv) -> anyhow::Result<Self> {
        let github = connect_github(&env);
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to create http client")?;
        Ok(Self {
            root: root.to_path_buf(),
            env,
            github,
            http,
            child_env: Vec::new(),
        })
    }

    pub async fn set_status(&self, state: CommitState, description: &str) {
        let Some(github) = &self.github else {
            tracing::info!(?state, description, "commit status (not reported to GitHub)");
            return;
        };
        let sha = match self.env.sha() {
            Ok(sha) => sha,
            Err(e) => {
                tracing::warn!(error = %e, "skipping commit status");
                return;
            }
        };
        match github
            .create_commit_status(sha, state, description, STATUS_CONTEXT)
            .await
        {
            Ok(()) => tracing::info!(?state, description, "set commit status"),
            Err(e) => tracing::warn!(?state, error = %e, "failed to set commit status"),
        }
    }

    /// Export user variables and the auth token for the sanity CLI and later steps.
    pub fn export_env(&mut self, setup: &SetupArgs) -> anyhow::Result<()> {
        for (key, value) in actions::parse_env_assignments(&setup.environment_variables) {
            actions::export_variable(&self.env, &key, &value)
                .with_context(|| format!("failed to export {key}"))?;
            tracing::debug!(key = %key, "set");
            self.child_env.push((key, value));
        }

        match non_empty(setup.token.as_deref()) {
            Some(token) => {
                actions::export_variable(&self.env, AUTH_TOKEN_VAR, &token)
                    .context("failed to export the Sanity auth token")?;
                self.child_env.push((AUTH_TOKEN_VAR.to_string(), token));
            }
            None => tracing::warn!("no Sanity auth token provided; sanity commands may fail"),
        }

        tracing::info!("environment variables set");
        Ok(())
    }

    /// Package manager exported by `package-manager`, else detected from lockfiles.
    pub fn package_manager(&self) -> PackageManager {
        std::env::var(PACKAGE_MANAGER_VAR)
            .ok()
            .and_then(|name| PackageManager::parse(&name))
            .unwrap_or_else(|| workspace::detect_package_manager(&self.root))
    }

    pub async fn install_dependencies(&self) -> anyhow::Result<()> {
        let manager = self.package_manager();
        sanity_cli::exec(
            manager.as_str(),
            &["install".to_string()],
            &self.root,
            &self.child_env,
        )
        .await
        .with_context(|| format!("failed to run {manager} install"))?;
        tracing::info!(%manager, "installed dependencies");
        Ok(())
    }

    pub async fn install_cli(&self, version: &str) -> anyhow::Result<SanityCli> {
        let bin = sanity_cli::install_sanity_cli(&self.root, version, &self.child_env)
            .await
            .context("failed to install @sanity/cli")?;
        Ok(SanityCli::new(bin, self.root.clone(), self.child_env.clone()))
    }

    pub fn resolve_context(&self) -> anyhow::Result<DeploymentContext> {
        DeploymentContext::resolve(&self.root, &self.env)
            .context("failed to resolve deployment config")
    }

    /// Record a GitHub deployment of `kind` with one success status per URL.
    pub async fn record_deployment(&self, kind: &str, ctx: &DeploymentContext, urls: &[String]) {
        let Some(github) = &self.github else {
            tracing::info!(kind, "no GitHub client, skipping deployment record");
            return;
        };
        let result = async {
            let sha = self.env.sha()?;
            let id = github
                .create_deployment(sha, &ctx.environment(kind), ctx.is_pull_request)
                .await?;
            for url in urls {
                github
                    .create_deployment_status(
                        id,
                        DeploymentState::Success,
                        url,
                        &format!("{kind} deployed"),
                    )
                    .await?;
            }
            Ok::<_, studio_deploy_core::DeployError>(id)
        }
        .await;
        match result {
            Ok(id) => tracing::info!(kind, deployment = id, "recorded GitHub deployment"),
            Err(e) => tracing::warn!(kind, error = %e, "failed to create deployment"),
        }
    }

    /// Create or update the status comment. Only on pull requests.
    pub async fn comment(&self, ctx: &DeploymentContext, report: &DeploymentReport) {
        if !ctx.is_pull_request {
            return;
        }
        let Some(github) = &self.github else {
            tracing::info!("no GitHub client, skipping PR comment");
            return;
        };
        let pr = match self.env.pull_request_number() {
            Ok(pr) => pr,
            Err(e) => {
                tracing::warn!(error = %e, "failed to create PR comment");
                return;
            }
        };
        let body = render_report(report, Utc::now());
        reconcile::post_status_comment(github, pr, &body).await;
    }

    /// Mark the commit `success` or `failure` according to how the run went.
    pub async fn finish<T>(&self, result: &anyhow::Result<T>, success: &str, failure: &str) {
        let (state, description) = match result {
            Ok(_) => (CommitState::Success, success),
            Err(_) => (CommitState::Failure, failure),
        };
        self.set_status(state, description).await;
    }

    pub fn set_output(&self, name: &str, value: &str) -> anyhow::Result<()> {
        actions::set_output(&self.env, name, value)
            .with_context(|| format!("failed to set output {name}"))
    }
}

fn connect_github(env: &GithubEnv) -> Option<GithubClient> {
    let Some(token) = env.token.as_deref() else {
        tracing::info!("GITHUB_TOKEN not set, GitHub reporting disabled");
        return None;
    };
    let client = env
        .repo()
        .and_then(|repo| GithubClient::new(env.api_url(), token, repo));
    match client {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::warn!(error = %e, "GitHub reporting disabled");
            None
        }
    }
}
