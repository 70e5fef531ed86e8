use crate::output::print_json;
use crate::pipeline::{GraphqlTargetArgs, Pipeline, SetupArgs};
use anyhow::Context;
use clap::Args;
use serde::Serialize;
use std::path::Path;
use studio_deploy_core::{
    deployment_id::DeploymentContext, env::GithubEnv, github::CommitState, host_override,
    sanity_cli,
};

#[derive(Args, Debug, Clone)]
pub struct CleanupArgs {
    #[command(flatten)]
    pub setup: SetupArgs,

    /// Undeploy the preview studio
    #[arg(long, env = "INPUT_STUDIO_CLEANUP")]
    pub studio_cleanup: bool,

    /// Undeploy the preview GraphQL API
    #[arg(long, env = "INPUT_GRAPHQL_CLEANUP")]
    pub graphql_cleanup: bool,

    #[command(flatten)]
    pub graphql: GraphqlTargetArgs,
}

#[derive(Debug, Serialize)]
struct CleanupSummary {
    deployment_id: Option<String>,
    studio_removed: bool,
    graphql_removed: bool,
}

pub fn run(root: &Path, args: CleanupArgs, json: bool) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let mut pipeline = Pipeline::new(root, GithubEnv::from_env())?;
        pipeline
            .set_status(CommitState::Pending, "Sanity cleanup in progress...")
            .await;

        let result = execute(&mut pipeline, &args).await;
        pipeline
            .finish(&result, "Sanity cleanup successful!", "Sanity cleanup failed.")
            .await;
        let summary = result.context("Sanity cleanup failed")?;

        if json {
            print_json(&summary)?;
        }
        Ok(())
    })
}

async fn execute(pipeline: &mut Pipeline, args: &CleanupArgs) -> anyhow::Result<CleanupSummary> {
    pipeline.export_env(&args.setup)?;
    let cli = pipeline.install_cli(&args.setup.cli_version).await?;
    let ctx = pipeline.resolve_context()?;

    if args.studio_cleanup {
        clean_studio(pipeline, &cli, &ctx).await?;
    } else {
        tracing::info!("skipping studio cleanup");
    }

    if args.graphql_cleanup {
        cli.run(&sanity_cli::graphql_undeploy_args(&args.graphql.options(), &ctx))
            .await
            .context("failed GraphQL cleanup")?;
        tracing::info!("GraphQL undeployed");
    } else {
        tracing::info!("skipping GraphQL cleanup");
    }

    Ok(CleanupSummary {
        deployment_id: ctx.deployment_id,
        studio_removed: args.studio_cleanup,
        graphql_removed: args.graphql_cleanup,
    })
}

async fn clean_studio(
    pipeline: &Pipeline,
    cli: &sanity_cli::SanityCli,
    ctx: &DeploymentContext,
) -> anyhow::Result<()> {
    if let Some(id) = ctx.preview_id() {
        host_override::override_host(&pipeline.root, id)
            .context("failed to point studioHost at the preview")?;
    }
    cli.run(&sanity_cli::undeploy_args())
        .await
        .context("failed Studio cleanup")?;
    tracing::info!("studio undeployed");
    Ok(())
}
