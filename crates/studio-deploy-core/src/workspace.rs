//! Project workspace helpers: package manager detection, build output size,
//! and deployment URL probing.

use crate::error::Result;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// PackageManager
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Npm,
    Pnpm,
    Yarn,
}

/// Lockfiles in detection priority order.
const LOCKFILES: [(&str, PackageManager); 3] = [
    ("pnpm-lock.yaml", PackageManager::Pnpm),
    ("yarn.lock", PackageManager::Yarn),
    ("package-lock.json", PackageManager::Npm),
];

impl PackageManager {
    pub fn as_str(self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Yarn => "yarn",
        }
    }

    /// Parse a manager name; anything unrecognized is `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "npm" => Some(PackageManager::Npm),
            "pnpm" => Some(PackageManager::Pnpm),
            "yarn" => Some(PackageManager::Yarn),
            _ => None,
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn detect_package_manager(root: &Path) -> PackageManager {
    LOCKFILES
        .iter()
        .find(|(file, _)| root.join(file).is_file())
        .map(|(_, pm)| *pm)
        .unwrap_or(PackageManager::Npm)
}

// ---------------------------------------------------------------------------
// Build output size
// ---------------------------------------------------------------------------

/// Total size in bytes of all regular files under `path`.
pub fn directory_size(path: &Path) -> Result<u64> {
    let mut total = 0;
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            total += directory_size(&entry.path())?;
        } else if file_type.is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut index = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && index < UNITS.len() - 1 {
        value /= 1024.0;
        index += 1;
    }
    if value >= 10.0 || value.fract() == 0.0 {
        format!("{value:.0} {}", UNITS[index])
    } else {
        format!("{value:.1} {}", UNITS[index])
    }
}

/// Human-readable size of a build directory, `"unknown"` if it can't be read.
pub fn describe_directory_size(path: &Path) -> String {
    match directory_size(path) {
        Ok(bytes) => format_bytes(bytes),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "dist size failed");
            "unknown".to_string()
        }
    }
}

// ---------------------------------------------------------------------------
// URL probing
// ---------------------------------------------------------------------------

/// Poll `url` until it answers successfully. HEAD first, GET when the server
/// rejects HEAD. Network errors count as a failed attempt.
pub async fn check_url(
    http: &reqwest::Client,
    url: &str,
    attempts: u32,
    delay: Duration,
) -> bool {
    for attempt in 1..=attempts {
        match http.head(url).send().await {
            Ok(resp) if resp.status().is_success() => return true,
            Ok(resp) if matches!(resp.status().as_u16(), 405 | 501) => {
                if let Ok(get) = http.get(url).send().await {
                    if get.status().is_success() {
                        return true;
                    }
                }
            }
            Ok(resp) => {
                tracing::debug!(url, attempt, status = resp.status().as_u16(), "url not ready");
            }
            Err(e) => tracing::debug!(url, attempt, error = %e, "url probe failed"),
        }
        if attempt < attempts {
            tokio::time::sleep(delay).await;
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
