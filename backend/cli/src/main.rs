mod api;
mod config;
mod fixture;
mod output;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use tessera_commands::{build_session, CommandBus};
use tessera_config::DashboardConfig;
use tessera_core::{CommandEnvelope, DashboardCommand, ObjRef};
use tessera_logging::{init_logger, EventLogger, LoggerOptions};

use api::AppState;
use config::CliConfig;
use fixture::FileBackend;

#[derive(Parser)]
#[command(name = "tessera")]
#[command(about = "Tessera: drive a dashboard session from commands")]
#[command(version)]
struct Cli {
    /// Log console lines as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a script of commands against a fixture backend
    Run {
        /// Backend fixture (JSON)
        #[arg(short, long)]
        fixture: PathBuf,
        /// JSON array of command envelopes
        #[arg(short, long)]
        script: PathBuf,
        /// Dashboard config (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Dashboard identifier; defaults to the first one in the fixture
        #[arg(short, long)]
        dashboard: Option<String>,
        /// Print the final layout after the script finishes
        #[arg(long)]
        print_layout: bool,
    },
    /// Load and validate a dashboard config file
    ValidateConfig {
        path: PathBuf,
    },
    /// Serve a session over HTTP
    Serve {
        #[arg(short, long)]
        fixture: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        dashboard: Option<String>,
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let env = CliConfig::from_env();

    init_logger(&LoggerOptions {
        level: env.log_level.clone(),
        log_dir: env.log_dir.clone(),
        json_console: cli.json_logs,
    });

    match cli.command {
        Commands::Run {
            fixture,
            script,
            config,
            dashboard,
            print_layout,
        } => {
            let bus = open_session(&env, &fixture, config.as_deref(), dashboard).await?;
            let ok = run_script(&bus, &script).await?;
            if print_layout {
                let layout = bus.store().select(|s| s.layout.layout.clone());
                println!("{}", serde_json::to_string_pretty(&layout)?);
            }
            bus.shutdown();
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::ValidateConfig { path } => {
            if !path.exists() {
                bail!("config file not found: {}", path.display());
            }
            match tessera_config::load_and_prepare(&path).await {
                Ok(_) => output::note_success(&format!("{} is valid", path.display())),
                Err(e) => {
                    output::note_error(&format!("{e:#}"));
                    std::process::exit(1);
                }
            }
        }
        Commands::Serve {
            fixture,
            config,
            dashboard,
            port,
        } => {
            let env = CliConfig {
                port: port.unwrap_or(env.port),
                ..env
            };
            let bus = open_session(&env, &fixture, config.as_deref(), dashboard).await?;
            run_server(&env, bus).await?;
        }
    }

    Ok(())
}

/// Build a session over the fixture, log its events and initialize it.
async fn open_session(
    env: &CliConfig,
    fixture: &Path,
    config: Option<&Path>,
    dashboard: Option<String>,
) -> Result<CommandBus> {
    let config = match config {
        Some(path) => tessera_config::load_and_prepare(path).await?,
        None => DashboardConfig::default(),
    };
    let backend = FileBackend::load(fixture).await?;
    let dashboard_ref = match dashboard {
        Some(id) => Some(ObjRef::typed(id, "analyticalDashboard")),
        None => backend.first_dashboard(),
    };

    let bus = build_session(Arc::new(backend), env.workspace.clone(), dashboard_ref, config);
    bus.subscribe(None, EventLogger::log_event);

    bus.dispatch_and_wait(CommandEnvelope::new(DashboardCommand::InitializeDashboard {
        dashboard_ref: None,
        config: None,
    }))
    .await
    .context("dashboard initialization failed")?;
    Ok(bus)
}

/// Dispatch every envelope in order, printing events as they are emitted.
/// Returns whether every command succeeded.
async fn run_script(bus: &CommandBus, script: &Path) -> Result<bool> {
    let raw = tokio::fs::read_to_string(script)
        .await
        .with_context(|| format!("Failed to read script: {}", script.display()))?;
    let envelopes: Vec<Value> =
        serde_json::from_str(&raw).with_context(|| format!("Script must be a JSON array: {}", script.display()))?;

    bus.subscribe(None, |event| {
        output::write_line(&mut std::io::stdout().lock(), &output::event_line(event));
    });

    let mut failures = 0usize;
    for (i, value) in envelopes.iter().enumerate() {
        // a decode failure was already reported as a rejection event
        let Ok(handle) = bus.dispatch_json(value) else {
            failures += 1;
            continue;
        };
        if let Err(e) = handle.wait().await {
            failures += 1;
            output::note_warn(&format!("command #{i} failed: {e}"));
        }
    }

    info!(commands = envelopes.len(), failures, "Script finished");
    Ok(failures == 0)
}

async fn run_server(env: &CliConfig, bus: CommandBus) -> Result<()> {
    let app = api::build_router(Arc::new(AppState { bus: bus.clone() }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());
    let addr = format!("{}:{}", env.bind_address, env.port);

    info!(addr = %addr, workspace = %env.workspace, "HTTP API listening");
    let listener = TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
            bus.shutdown();
        })
        .await?;

    Ok(())
}
