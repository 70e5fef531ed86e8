use crate::output::print_json;
use anyhow::Context;
use clap::Args;
use std::path::Path;
use studio_deploy_core::{
    config_file,
    deployment_id::{build_deployment_id, generate_deployment_id, DeploymentUrls},
    env::GithubEnv,
};

#[derive(Args, Debug, Clone)]
pub struct DeploymentIdArgs {
    /// Studio host (default: studioHost from the Sanity CLI config)
    #[arg(long)]
    pub host: Option<String>,

    /// Branch name (default: the current branch from the GitHub environment)
    #[arg(long)]
    pub branch: Option<String>,

    /// Also print the preview URLs for this project
    #[arg(long)]
    pub project_id: Option<String>,

    /// Dataset for the GraphQL URLs (default: from the Sanity CLI config)
    #[arg(long, requires = "project_id")]
    pub dataset: Option<String>,
}

pub fn run(root: &Path, args: DeploymentIdArgs, json: bool) -> anyhow::Result<()> {
    let env = GithubEnv::from_env();
    let id = match (&args.host, &args.branch) {
        (None, None) => generate_deployment_id(root, &env)
            .context("failed to generate deployment id")?,
        (host, branch) => {
            let host = match host {
                Some(h) => h.clone(),
                None => config_file::studio_host(root)?,
            };
            let branch = match branch.as_deref().or(env.current_branch()) {
                Some(b) => b.to_string(),
                None => anyhow::bail!("no --branch given and no branch found in the environment"),
            };
            build_deployment_id(&host, &branch)?
        }
    };

    let urls = match &args.project_id {
        Some(project_id) => {
            let dataset = match &args.dataset {
                Some(d) => d.clone(),
                None => config_file::dataset(root)?,
            };
            Some(DeploymentUrls::new(&id, project_id, &dataset))
        }
        None => None,
    };

    if json {
        #[derive(serde::Serialize)]
        struct IdOutput<'a> {
            deployment_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            urls: Option<&'a DeploymentUrls>,
        }
        print_json(&IdOutput {
            deployment_id: &id,
            urls: urls.as_ref(),
        })?;
    } else {
        println!("{id}");
        if let Some(urls) = &urls {
            println!("studio:             {}", urls.studio);
            println!("graphql:            {}", urls.graphql);
            println!("graphql playground: {}", urls.graphql_playground);
        }
    }
    Ok(())
}
