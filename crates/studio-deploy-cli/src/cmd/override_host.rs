use crate::output::print_json;
use anyhow::Context;
use std::path::Path;
use studio_deploy_core::host_override::override_host;

pub fn run(root: &Path, host: &str, json: bool) -> anyhow::Result<()> {
    let result = override_host(root, host)
        .with_context(|| format!("failed to override studioHost in {}", root.display()))?;

    if json {
        #[derive(serde::Serialize)]
        struct OverrideOutput<'a> {
            config: &'a Path,
            backup: &'a Path,
            host: &'a str,
        }
        print_json(&OverrideOutput {
            config: &result.config,
            backup: &result.backup,
            host,
        })?;
    } else {
        println!("Updated studioHost in {}", result.config.display());
        println!("Backup: {}", result.backup.display());
    }
    Ok(())
}
