use crate::output::print_json;
use crate::pipeline::PACKAGE_MANAGER_VAR;
use anyhow::Context;
use std::path::Path;
use studio_deploy_core::{actions, env::GithubEnv, workspace::detect_package_manager};

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let manager = detect_package_manager(root);
    let env = GithubEnv::from_env();

    actions::set_output(&env, "manager", manager.as_str())
        .context("failed to set output manager")?;
    actions::export_variable(&env, PACKAGE_MANAGER_VAR, manager.as_str())
        .with_context(|| format!("failed to export {PACKAGE_MANAGER_VAR}"))?;
    tracing::info!(%manager, "using package manager");

    if json {
        #[derive(serde::Serialize)]
        struct ManagerOutput {
            manager: &'static str,
        }
        print_json(&ManagerOutput {
            manager: manager.as_str(),
        })?;
    } else {
        println!("{manager}");
    }
    Ok(())
}
