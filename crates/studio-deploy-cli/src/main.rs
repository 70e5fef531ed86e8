mod cmd;
mod output;
mod pipeline;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    build_deploy::BuildDeployArgs, cleanup::CleanupArgs, deployment_id::DeploymentIdArgs,
    parse_output::OutputKind,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "studio-deploy",
    about = "Build and deploy Sanity Studio and GraphQL previews from CI",
    version,
    propagate_version = true
)]
struct Cli {
    /// Studio project root (default: auto-detect from the nearest Sanity CLI config)
    #[arg(long, global = true, env = "STUDIO_DEPLOY_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install, build and deploy the studio and GraphQL API, then report on the PR
    BuildDeploy(BuildDeployArgs),

    /// Remove preview deployments (run when a pull request closes)
    Cleanup(CleanupArgs),

    /// Detect the package manager from lockfiles and export it for later steps
    PackageManager,

    /// Print the preview deployment id for a host and branch
    DeploymentId(DeploymentIdArgs),

    /// Point the Sanity CLI config at a different studio host
    OverrideHost {
        /// New studioHost value
        host: String,
    },

    /// Extract deployment URLs from saved `sanity` output
    ParseOutput {
        #[arg(value_enum)]
        kind: OutputKind,

        /// Read output from a file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::BuildDeploy(_) | Commands::Cleanup(_) | Commands::PackageManager => {
            tracing::Level::INFO
        }
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::BuildDeploy(args) => cmd::build_deploy::run(&root, args, cli.json),
        Commands::Cleanup(args) => cmd::cleanup::run(&root, args, cli.json),
        Commands::PackageManager => cmd::package_manager::run(&root, cli.json),
        Commands::DeploymentId(args) => cmd::deployment_id::run(&root, args, cli.json),
        Commands::OverrideHost { host } => cmd::override_host::run(&root, &host, cli.json),
        Commands::ParseOutput { kind, file } => {
            cmd::parse_output::run(kind, file.as_deref(), cli.json)
        }
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
