//! canscope server
//!
//! Reads frames from a CAN interface, aggregates them, and serves the live
//! dashboard with WebSocket push.
//!
//! Run with: cargo run --bin canscope -- --interface vcan0
//!
//! # Configuration
//!
//! Settings come from (lowest to highest precedence) built-in defaults, the
//! config file, `CANSCOPE_*` environment variables and command-line flags.
//! `RUST_LOG` overrides the configured log level.

use anyhow::Context;
use canscope::api::{serve, AppState};
use canscope::config::{generate_default_config, Config};
use canscope::ingest::{Ingestor, Monitor};
use canscope::source::{self, SocketCanSource};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};

#[derive(Parser)]
#[command(name = "canscope")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live CAN bus statistics and filtered frame log, pushed to the browser")]
struct Cli {
    /// Config file (default: search standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CAN interface to listen on
    #[arg(short, long)]
    interface: Option<String>,

    /// HTTP / WebSocket port
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory with the dashboard's static files
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Disable the filtered frame log
    #[arg(long)]
    no_filter: bool,

    /// Push the number of distinct identifiers when it changes
    #[arg(long)]
    unique_id_count: bool,

    /// Print a default config file and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    // Warnings from loading are reported before the configured subscriber exists
    let mut config =
        tracing::subscriber::with_default(canscope::logging::bootstrap(), || match &cli.config {
            Some(path) => Config::load_with_env(path),
            None => Ok(Config::load_default()),
        })?;
    apply_cli_overrides(&mut config, &cli);

    canscope::logging::init(&config.logging);
    tracing::info!("Starting canscope v{}", env!("CARGO_PKG_VERSION"));

    let monitor_config = config.monitor_config()?;
    match &monitor_config.filter {
        Some(filter) => tracing::info!(
            "Filtered log: 0x{:X}..=0x{:X}, {} entries",
            filter.range.start(),
            filter.range.end(),
            filter.capacity
        ),
        None => tracing::info!("Filtered log disabled"),
    }
    let monitor = Monitor::new(monitor_config);

    // Nothing is served unless frames can be ingested
    let can = SocketCanSource::open(&config.bus.interface)
        .with_context(|| format!("cannot listen on {}", config.bus.interface))?;

    let (frames_tx, frames_rx) = mpsc::channel(config.bus.channel_capacity);
    source::spawn(can, frames_tx)?;
    tracing::info!("Listening for CAN messages on {}", config.bus.interface);

    let (stopped_tx, stopped_rx) = oneshot::channel();
    let ingestor = Ingestor::new(monitor.clone(), frames_rx);
    tokio::spawn(async move {
        let processed = ingestor.run().await;
        let _ = stopped_tx.send(processed);
    });

    let state = AppState::new(monitor.clone(), config.server.clone());
    serve(state, &config.server.addr(), async move {
        let _ = stopped_rx.await;
    })
    .await?;

    if !monitor.source_active() {
        anyhow::bail!("frame source on {} stopped", config.bus.interface);
    }

    tracing::info!("canscope stopped");
    Ok(())
}

fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(interface) = &cli.interface {
        config.bus.interface = interface.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(dir) = &cli.static_dir {
        config.server.static_dir = dir.clone();
    }
    if cli.no_filter {
        config.filter.enabled = false;
    }
    if cli.unique_id_count {
        config.stats.unique_id_count = true;
    }
}
