//! Structured Logger
//!
//! Console output plus an optional rolling NDJSON file, with the level taken
//! from `RUST_LOG` when set.

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "tessera.log";

#[derive(Debug, Clone)]
pub struct LoggerOptions {
    /// Fallback filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for `tessera.log.YYYY-MM-DD`. No file output when `None`.
    pub log_dir: Option<PathBuf>,
    /// Emit console lines as JSON instead of the human format.
    pub json_console: bool,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            level: "info".into(),
            log_dir: None,
            json_console: false,
        }
    }
}

/// Initialize the global subscriber. Calling it twice is a no-op.
pub fn init_logger(options: &LoggerOptions) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&options.level));

    let file_layer = options.log_dir.as_ref().map(|dir| {
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
        fmt::layer().json().with_writer(appender).with_ansi(false)
    });

    // stderr keeps stdout free for command output
    let (json_console, text_console) = if options.json_console {
        (Some(fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        (
            None,
            Some(fmt::layer().with_writer(std::io::stderr).with_target(false).with_ansi(true)),
        )
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_console)
        .with(text_console)
        .with(file_layer)
        .try_init();
}
