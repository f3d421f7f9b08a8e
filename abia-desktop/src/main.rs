use std::path::PathBuf;
use std::sync::Arc;

use abia_desktop::app::{AppState, BootstrapOptions};
use abia_desktop::ipc::{self, EventSink};
use abia_desktop::logging;
use abia_infrastructure::{AbiaPaths, ConfigService};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;

#[derive(Parser)]
#[command(name = "abia-desktop")]
#[command(about = "ABIA desktop host - JSON-lines bridge between the UI and the assistant", long_about = None)]
struct Cli {
    /// Configuration file (defaults to <data dir>/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data directory (defaults to the platform config dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Tracing filter, e.g. `info` or `abia_core=debug` (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = AbiaPaths::new(cli.data_dir.as_deref())?;
    paths
        .ensure_dirs()
        .with_context(|| format!("Failed to create {}", paths.base_dir().display()))?;

    let (events, outbound) = EventSink::channel();
    let _log_guard = logging::init(cli.log_level.as_deref(), &paths.logs_dir(), events.clone())?;

    let config_path = cli.config.unwrap_or_else(|| paths.config_file());
    let config = ConfigService::new(config_path).load().await?;

    let state = Arc::new(AppState::new());
    state
        .ensure_initialized(BootstrapOptions::new(config, paths))
        .await
        .context("Failed to initialize services")?;
    tracing::info!("[Startup] Ready");

    let served = ipc::serve(
        state.clone(),
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        events,
        outbound,
    )
    .await;

    if let Ok(services) = state.services() {
        services.shutdown().await;
    }
    tracing::info!("[Shutdown] Bye");
    served
}
