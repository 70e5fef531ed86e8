use std::path::{Path, PathBuf};
use studio_deploy_core::config_file::find_config;

/// Resolve the studio project root.
///
/// Priority:
/// 1. `--root` flag / `STUDIO_DEPLOY_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for a Sanity CLI config
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_studio_root(&cwd).unwrap_or(cwd)
}

fn find_studio_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| find_config(dir).is_some())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn finds_nearest_config_upwards() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("sanity.cli.ts"), "export default {}").unwrap();
        let subdir = dir.path().join("schemas/documents");
        std::fs::create_dir_all(&subdir).unwrap();

        assert_eq!(find_studio_root(&subdir), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn nested_studio_shadows_outer_one() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("sanity.json"), "{}").unwrap();
        let studio = dir.path().join("apps/studio");
        std::fs::create_dir_all(&studio).unwrap();
        std::fs::write(studio.join("sanity.cli.js"), "").unwrap();

        assert_eq!(find_studio_root(&studio), Some(studio.clone()));
    }
}
