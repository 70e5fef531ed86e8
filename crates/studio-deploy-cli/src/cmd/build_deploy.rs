use crate::output::print_json;
use crate::pipeline::{non_empty, GraphqlTargetArgs, Pipeline, SetupArgs};
use anyhow::Context;
use clap::Args;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use studio_deploy_core::{
    deployment_id::DeploymentContext,
    env::GithubEnv,
    github::CommitState,
    host_override,
    output::{parse_graphql_output, parse_studio_output},
    paths::DEFAULT_DIST_DIR,
    report::DeploymentReport,
    sanity_cli::{self, SanityCli, StudioBuildOptions},
    workspace,
};

const URL_CHECK_ATTEMPTS: u32 = 3;
const URL_CHECK_DELAY: Duration = Duration::from_secs(2);

#[derive(Args, Debug, Clone)]
pub struct BuildDeployArgs {
    #[command(flatten)]
    pub setup: SetupArgs,

    /// Build the studio and extract its schema manifest
    #[arg(long, env = "INPUT_BUILD")]
    pub build: bool,

    /// Studio build output directory (default: dist)
    #[arg(long, env = "INPUT_STUDIO_OUTPUT_PATH")]
    pub studio_output_path: Option<String>,

    #[arg(long, env = "INPUT_STUDIO_SOURCE_MAPS")]
    pub studio_source_maps: bool,

    #[arg(long, env = "INPUT_STUDIO_NO_MINIFY")]
    pub studio_no_minify: bool,

    /// Where `sanity manifest extract` writes the manifest
    #[arg(long, env = "INPUT_SCHEMA_PATH")]
    pub schema_path: Option<String>,

    #[arg(long, env = "INPUT_SCHEMA_WORKSPACE")]
    pub schema_workspace: Option<String>,

    #[arg(long, env = "INPUT_SCHEMA_ENFORCE_REQUIRED_FIELDS")]
    pub schema_enforce_required_fields: bool,

    /// Fail the run when schema extraction fails
    #[arg(long, env = "INPUT_SCHEMA_REQUIRED")]
    pub schema_required: bool,

    /// Deploy the studio (to a preview host on pull requests)
    #[arg(long, env = "INPUT_STUDIO_DEPLOY")]
    pub studio_deploy: bool,

    /// Deploy the GraphQL API
    #[arg(long, env = "INPUT_GRAPHQL_DEPLOY")]
    pub graphql_deploy: bool,

    #[command(flatten)]
    pub graphql: GraphqlTargetArgs,

    /// `true` or `false` to force the GraphQL playground on or off
    #[arg(long, env = "INPUT_GRAPHQL_OVERRIDE_PLAYGROUND")]
    pub graphql_override_playground: Option<String>,

    #[arg(long, env = "INPUT_GRAPHQL_OVERRIDE_GENERATION")]
    pub graphql_override_generation: Option<String>,

    #[arg(long, env = "INPUT_GRAPHQL_OVERRIDE_NON_NULL_DOCUMENT_FIELDS")]
    pub graphql_override_non_null_document_fields: bool,

    #[arg(long, env = "INPUT_GRAPHQL_OVERRIDE_WITH_UNION_CACHE")]
    pub graphql_override_with_union_cache: bool,
}

impl BuildDeployArgs {
    fn output_path(&self) -> Option<String> {
        non_empty(self.studio_output_path.as_deref())
    }

    fn graphql_options(&self) -> sanity_cli::GraphqlOptions {
        sanity_cli::GraphqlOptions {
            playground: match self.graphql_override_playground.as_deref().map(str::trim) {
                Some("true") => Some(true),
                Some("false") => Some(false),
                _ => None,
            },
            generation: non_empty(self.graphql_override_generation.as_deref()),
            non_null_document_fields: self.graphql_override_non_null_document_fields,
            with_union_cache: self.graphql_override_with_union_cache,
            ..self.graphql.options()
        }
    }
}

/// Values written as step outputs.
#[derive(Debug, Default, Serialize)]
struct DeploySummary {
    build_path: Option<String>,
    studio_url: Option<String>,
    graphql_urls: Vec<String>,
    deployment_id: Option<String>,
    is_pr: bool,
}

struct BuildInfo {
    dist: String,
    size: String,
}

pub fn run(root: &Path, args: BuildDeployArgs, json: bool) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let mut pipeline = Pipeline::new(root, GithubEnv::from_env())?;
        pipeline
            .set_status(CommitState::Pending, "Sanity build and deploy in progress...")
            .await;

        let result = execute(&mut pipeline, &args).await;
        pipeline
            .finish(
                &result,
                "Sanity build and deploy successful!",
                "Sanity build and deploy failed.",
            )
            .await;
        let summary = result.context("Sanity build and deploy failed")?;

        write_outputs(&pipeline, &summary)?;
        if json {
            print_json(&summary)?;
        } else if let Some(url) = &summary.studio_url {
            println!("Studio: {url}");
        }
        Ok(())
    })
}

async fn execute(pipeline: &mut Pipeline, args: &BuildDeployArgs) -> anyhow::Result<DeploySummary> {
    pipeline.export_env(&args.setup)?;
    pipeline.install_dependencies().await?;
    let cli = pipeline.install_cli(&args.setup.cli_version).await?;

    let build = build_studio(pipeline, &cli, args).await?;
    extract_schema(&cli, args).await?;

    let ctx = pipeline.resolve_context()?;
    let studio_url = deploy_studio(pipeline, &cli, &ctx, args).await?;
    let graphql_urls = deploy_graphql(pipeline, &cli, &ctx, args).await?;

    let report = DeploymentReport {
        deployment_id: ctx.deployment_id.clone(),
        studio_deployed: args.studio_deploy,
        studio_url: studio_url.clone(),
        graphql_deployed: args.graphql_deploy,
        graphql_urls: graphql_urls.clone(),
        built: args.build,
        studio_dist: build.as_ref().map(|b| b.dist.clone()),
        studio_dist_size: build.as_ref().map(|b| b.size.clone()),
        source_maps: args.studio_source_maps,
        no_minify: args.studio_no_minify,
        schema_path: non_empty(args.schema_path.as_deref()),
        schema_workspace: non_empty(args.schema_workspace.as_deref()),
        schema_enforce_required_fields: args.schema_enforce_required_fields,
        schema_required: args.schema_required,
    };
    pipeline.comment(&ctx, &report).await;

    Ok(DeploySummary {
        build_path: build.map(|b| b.dist),
        studio_url,
        graphql_urls,
        deployment_id: ctx.deployment_id,
        is_pr: ctx.is_pull_request,
    })
}

async fn build_studio(
    pipeline: &Pipeline,
    cli: &SanityCli,
    args: &BuildDeployArgs,
) -> anyhow::Result<Option<BuildInfo>> {
    if !args.build {
        tracing::info!("skipping studio build");
        return Ok(None);
    }
    let opts = StudioBuildOptions {
        output_path: args.output_path(),
        source_maps: args.studio_source_maps,
        no_minify: args.studio_no_minify,
    };
    cli.run(&sanity_cli::build_args(&opts))
        .await
        .context("failed to build Studio")?;

    let dist = opts
        .output_path
        .unwrap_or_else(|| DEFAULT_DIST_DIR.to_string());
    let size = workspace::describe_directory_size(&pipeline.root.join(&dist));
    tracing::info!(dist = %dist, size = %size, "build complete");
    Ok(Some(BuildInfo { dist, size }))
}

async fn extract_schema(cli: &SanityCli, args: &BuildDeployArgs) -> anyhow::Result<()> {
    if !args.build {
        tracing::info!("skipping schema extraction");
        return Ok(());
    }
    let schema_path = non_empty(args.schema_path.as_deref());
    match cli
        .run(&sanity_cli::schema_extract_args(schema_path.as_deref()))
        .await
    {
        Ok(_) => tracing::info!("schema extraction complete"),
        Err(e) if args.schema_required => {
            return Err(e).context("failed to extract schema");
        }
        Err(e) => tracing::error!(error = %e, "schema extraction failed"),
    }
    Ok(())
}

async fn deploy_studio(
    pipeline: &Pipeline,
    cli: &SanityCli,
    ctx: &DeploymentContext,
    args: &BuildDeployArgs,
) -> anyhow::Result<Option<String>> {
    if !args.studio_deploy {
        tracing::info!("skipping studio deploy");
        return Ok(None);
    }
    if let Some(id) = ctx.preview_id() {
        host_override::override_host(&pipeline.root, id)
            .context("failed to point studioHost at the preview")?;
    }

    let output_path = args.output_path();
    let out = cli
        .run(&sanity_cli::deploy_args(output_path.as_deref()))
        .await
        .context("failed to deploy Studio")?;

    let Some(url) = parse_studio_output(&out).url else {
        tracing::warn!("no studio URL found in deploy output");
        return Ok(None);
    };
    if !workspace::check_url(&pipeline.http, &url, URL_CHECK_ATTEMPTS, URL_CHECK_DELAY).await {
        tracing::warn!(url = %url, "studio URL is not reachable yet");
    }
    pipeline
        .record_deployment("studio", ctx, std::slice::from_ref(&url))
        .await;
    tracing::info!(url = %url, "studio deployed");
    Ok(Some(url))
}

async fn deploy_graphql(
    pipeline: &Pipeline,
    cli: &SanityCli,
    ctx: &DeploymentContext,
    args: &BuildDeployArgs,
) -> anyhow::Result<Vec<String>> {
    if !args.graphql_deploy {
        tracing::info!("skipping GraphQL deploy");
        return Ok(Vec::new());
    }
    let out = cli
        .run(&sanity_cli::graphql_deploy_args(&args.graphql_options(), ctx))
        .await
        .context("failed to deploy GraphQL")?;

    let urls: Vec<String> = parse_graphql_output(&out)
        .into_iter()
        .filter_map(|d| d.url)
        .collect();
    if urls.is_empty() {
        tracing::warn!("no GraphQL URLs found in deploy output");
    } else {
        pipeline.record_deployment("graphql", ctx, &urls).await;
    }
    tracing::info!(count = urls.len(), "GraphQL deployed");
    Ok(urls)
}

fn write_outputs(pipeline: &Pipeline, summary: &DeploySummary) -> anyhow::Result<()> {
    pipeline.set_output("build-path", summary.build_path.as_deref().unwrap_or_default())?;
    pipeline.set_output("studio-url", summary.studio_url.as_deref().unwrap_or_default())?;
    pipeline.set_output("graphql-urls", &summary.graphql_urls.join(","))?;
    pipeline.set_output(
        "deployment-id",
        summary.deployment_id.as_deref().unwrap_or_default(),
    )?;
    pipeline.set_output("is-pr", if summary.is_pr { "true" } else { "false" })?;
    Ok(())
}
