use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// File name constants
// ---------------------------------------------------------------------------

/// Recognized Sanity CLI config files, in lookup priority order.
pub const CONFIG_CANDIDATES: [&str; 4] = [
    "sanity.cli.ts",
    "sanity.cli.js",
    "sanity.cli.mjs",
    "sanity.json",
];

pub const SANITY_CLI_DIR: &str = ".sanity-cli";
pub const SANITY_CLI_MANIFEST: &str = "package.json";
pub const DEFAULT_DIST_DIR: &str = "dist";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// `<config>.<epoch_secs>.bak`, next to the original.
pub fn backup_path(config: &Path, epoch_secs: i64) -> PathBuf {
    let mut name = config
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{epoch_secs}.bak"));
    config.with_file_name(name)
}

pub fn sanity_cli_dir(root: &Path) -> PathBuf {
    root.join(SANITY_CLI_DIR)
}

pub fn sanity_cli_manifest(root: &Path) -> PathBuf {
    sanity_cli_dir(root).join(SANITY_CLI_MANIFEST)
}

pub fn sanity_cli_bin(root: &Path) -> PathBuf {
    sanity_cli_dir(root)
        .join("node_modules")
        .join(".bin")
        .join("sanity")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_keeps_original_name() {
        let config = Path::new("/tmp/studio/sanity.cli.ts");
        assert_eq!(
            backup_path(config, 1_700_000_000),
            PathBuf::from("/tmp/studio/sanity.cli.ts.1700000000.bak")
        );
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/studio");
        assert_eq!(
            sanity_cli_manifest(root),
            PathBuf::from("/tmp/studio/.sanity-cli/package.json")
        );
        assert_eq!(
            sanity_cli_bin(root),
            PathBuf::from("/tmp/studio/.sanity-cli/node_modules/.bin/sanity")
        );
    }

    #[test]
    fn json_config_is_last_candidate() {
        assert_eq!(CONFIG_CANDIDATES.last(), Some(&"sanity.json"));
    }
}
