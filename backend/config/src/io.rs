//! Config file reading.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::schema::DashboardConfig;

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "dashboard.yaml";

/// Resolve the config directory.
/// Priority: `TESSERA_CONFIG_DIR` env > `~/.tessera/` > `./.tessera`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TESSERA_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".tessera"),
        None => PathBuf::from(".tessera"),
    }
}

/// Resolve the full path to the main config file.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Load and parse the config from disk. YAML and JSON are both accepted.
///
/// Returns `Ok(Default::default())` if the file doesn't exist.
pub async fn load_config(path: &Path) -> Result<DashboardConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(DashboardConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: DashboardConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded dashboard config");
    Ok(config)
}
