//! Driving external tools: the `sanity` CLI, its installer and package managers.
//!
//! Every run captures stdout and stderr into one combined text (the deploy
//! output parsers need it) and echoes each line to the log as it arrives.

use crate::deployment_id::DeploymentContext;
use crate::error::{DeployError, Result};
use crate::io;
use crate::paths;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

const CLI_PACKAGE: &str = "@sanity/cli";

// ---------------------------------------------------------------------------
// Process execution
// ---------------------------------------------------------------------------

/// Bare names are looked up on `PATH`; anything with a directory part is used as-is.
fn resolve_program(program: &str) -> Result<PathBuf> {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return Ok(path.to_path_buf());
    }
    which::which(program).map_err(|_| DeployError::ToolNotFound(program.to_string()))
}

fn drain<R>(reader: R, sink: Arc<Mutex<String>>) -> tokio::task::JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut raw = Vec::new();
        loop {
            raw.clear();
            match reader.read_until(b'\n', &mut raw).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read child output");
                    break;
                }
            }
            // Invalid UTF-8 is replaced, never fatal.
            let text = String::from_utf8_lossy(&raw);
            let line = text.trim_end_matches(['\n', '\r']);
            tracing::info!("{line}");
            if let Ok(mut buf) = sink.lock() {
                buf.push_str(line);
                buf.push('\n');
            }
        }
    })
}

/// Run `program` in `cwd` and return its combined output.
/// A non-zero exit is [`DeployError::CommandFailed`].
pub async fn exec(
    program: &str,
    args: &[String],
    cwd: &Path,
    envs: &[(String, String)],
) -> Result<String> {
    let exe = resolve_program(program)?;
    tracing::debug!(program, args = ?args, cwd = %cwd.display(), "executing");

    let mut child = Command::new(&exe)
        .args(args)
        .current_dir(cwd)
        .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let combined = Arc::new(Mutex::new(String::new()));
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(drain(stdout, combined.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(drain(stderr, combined.clone()));
    }
    for reader in readers {
        let _ = reader.await;
    }

    let status = child.wait().await?;
    let output = combined
        .lock()
        .map(|buf| buf.clone())
        .unwrap_or_default();

    if !status.success() {
        return Err(DeployError::CommandFailed {
            program: program.to_string(),
            code: status.code(),
            output,
        });
    }
    Ok(output)
}

// ---------------------------------------------------------------------------
// SanityCli
// ---------------------------------------------------------------------------

/// A located `sanity` binary bound to a project root and run environment.
#[derive(Debug, Clone)]
pub struct SanityCli {
    pub bin: PathBuf,
    pub root: PathBuf,
    pub envs: Vec<(String, String)>,
}

impl SanityCli {
    pub fn new(bin: PathBuf, root: PathBuf, envs: Vec<(String, String)>) -> Self {
        Self { bin, root, envs }
    }

    pub async fn run(&self, args: &[String]) -> Result<String> {
        let program = self.bin.to_string_lossy();
        exec(&program, args, &self.root, &self.envs).await
    }
}

/// Install `@sanity/cli` into `<root>/.sanity-cli` and return the binary path.
pub async fn install_sanity_cli(
    root: &Path,
    version: &str,
    envs: &[(String, String)],
) -> Result<PathBuf> {
    let dir = paths::sanity_cli_dir(root);
    io::ensure_dir(&dir)?;

    let manifest = json!({
        "name": "sanity-cli-cache",
        "private": true,
        "version": "0.0.0",
        "description": "Generated manifest for installing @sanity/cli inside GitHub Actions",
        "license": "UNLICENSED",
    });
    io::atomic_write(
        &paths::sanity_cli_manifest(root),
        serde_json::to_string_pretty(&manifest)?.as_bytes(),
    )?;

    let spec = cli_package_spec(version);
    exec("npm", &["install".to_string(), spec.clone()], &dir, envs).await?;

    let bin = paths::sanity_cli_bin(root);
    tracing::info!(package = %spec, bin = %bin.display(), "installed sanity cli");
    Ok(bin)
}

fn cli_package_spec(version: &str) -> String {
    match version.trim() {
        "" | "latest" => CLI_PACKAGE.to_string(),
        v => format!("{CLI_PACKAGE}@{v}"),
    }
}

// ---------------------------------------------------------------------------
// Argument builders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct StudioBuildOptions {
    pub output_path: Option<String>,
    pub source_maps: bool,
    pub no_minify: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GraphqlOptions {
    pub override_tag: Option<String>,
    pub dataset: Option<String>,
    /// `Some(false)` disables the playground explicitly.
    pub playground: Option<bool>,
    pub generation: Option<String>,
    pub non_null_document_fields: bool,
    pub with_union_cache: bool,
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

pub fn build_args(opts: &StudioBuildOptions) -> Vec<String> {
    let mut args = strings(&["build"]);
    if let Some(out) = &opts.output_path {
        args.push(out.clone());
    }
    if opts.source_maps {
        args.push("--source-maps".into());
    }
    if opts.no_minify {
        args.push("--no-minify".into());
    }
    args.push("--yes".into());
    args
}

pub fn deploy_args(output_path: Option<&str>) -> Vec<String> {
    let mut args = strings(&["deploy", "--yes", "--no-build"]);
    if let Some(out) = output_path {
        args.push(out.to_string());
    }
    args
}

pub fn undeploy_args() -> Vec<String> {
    strings(&["undeploy", "--yes"])
}

pub fn schema_extract_args(path: Option<&str>) -> Vec<String> {
    let mut args = strings(&["manifest", "extract"]);
    if let Some(p) = path {
        args.extend(strings(&["--path", p]));
    }
    args
}

/// The override tag wins; otherwise previews are tagged with their deployment id.
pub fn resolve_tag<'a>(override_tag: Option<&'a str>, ctx: &'a DeploymentContext) -> Option<&'a str> {
    override_tag.or_else(|| ctx.preview_id())
}

fn push_tag_and_dataset(args: &mut Vec<String>, opts: &GraphqlOptions, ctx: &DeploymentContext) {
    if let Some(tag) = resolve_tag(opts.override_tag.as_deref(), ctx) {
        args.extend(strings(&["--tag", tag]));
    }
    if let Some(dataset) = &opts.dataset {
        args.extend(strings(&["--dataset", dataset.as_str()]));
    }
}

pub fn graphql_deploy_args(opts: &GraphqlOptions, ctx: &DeploymentContext) -> Vec<String> {
    let mut args = strings(&["graphql", "deploy", "--yes"]);
    push_tag_and_dataset(&mut args, opts, ctx);
    match opts.playground {
        Some(true) => args.push("--playground".into()),
        Some(false) => args.push("--no-playground".into()),
        None => {}
    }
    if let Some(generation) = &opts.generation {
        args.extend(strings(&["--generation", generation.as_str()]));
    }
    if opts.non_null_document_fields {
        args.push("--non-null-document-fields".into());
    }
    if opts.with_union_cache {
        args.push("--with-union-cache".into());
    }
    args
}

pub fn graphql_undeploy_args(opts: &GraphqlOptions, ctx: &DeploymentContext) -> Vec<String> {
    let mut args = strings(&["graphql", "undeploy", "--force"]);
    push_tag_and_dataset(&mut args, opts, ctx);
    args
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
