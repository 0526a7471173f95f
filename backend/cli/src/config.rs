use std::path::PathBuf;

/// Process-level settings for the CLI, read from the environment.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// Fallback log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Directory for rolling JSON logs
    pub log_dir: Option<PathBuf>,
    /// Workspace the session runs against
    pub workspace: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_dir: None,
            workspace: "default".to_string(),
        }
    }
}

impl CliConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: std::env::var("TESSERA_BIND").unwrap_or(defaults.bind_address),
            port: std::env::var("TESSERA_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: std::env::var("TESSERA_LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: std::env::var("TESSERA_LOG_DIR").ok().map(PathBuf::from),
            workspace: std::env::var("TESSERA_WORKSPACE").unwrap_or(defaults.workspace),
        }
    }
}
