//! canscope-dump
//!
//! Prints every frame received on a CAN interface. On Ctrl+C, prints all
//! stored frames grouped by identifier in numeric order.
//!
//! Run with: cargo run --bin canscope-dump -- vcan0

use anyhow::Context;
use canscope::frame::{FrameEvent, IdHex};
use canscope::source::{self, SocketCanSource};
use canscope::telemetry::StatsAggregator;
use clap::Parser;
use std::collections::BTreeMap;
use std::future::Future;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "canscope-dump")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Print CAN frames and a per-identifier summary on exit")]
struct Cli {
    /// CAN interface to listen on
    #[arg(default_value = "can0")]
    interface: String,

    /// Only print frames, do not keep them for the exit summary
    #[arg(long)]
    no_store: bool,
}

/// Frames kept for the exit summary, keyed by identifier
#[derive(Default)]
struct FrameStore {
    stats: StatsAggregator,
    frames: BTreeMap<u32, Vec<FrameEvent>>,
}

impl FrameStore {
    fn push(&mut self, frame: FrameEvent) {
        self.stats.record(frame.identifier);
        self.frames.entry(frame.identifier).or_default().push(frame);
    }

    fn print_summary(&self) {
        println!("\n--- All Received CAN Messages (Organized by ID) ---");
        if self.frames.is_empty() {
            println!("No messages were received and stored.");
            return;
        }

        for (id, count) in self.stats.snapshot().iter() {
            println!("\nID: {} ({} messages)", IdHex(id), count);
            for (index, frame) in self.frames.get(&id).into_iter().flatten().enumerate() {
                println!("  Message {}:", index + 1);
                println!("    Data: {}", frame.payload_hex());
                println!("    DLC: {}", frame.length);
                println!("    Timestamp: {:.6}s", frame.timestamp_secs);
            }
        }
    }
}

fn print_frame(frame: &FrameEvent) {
    println!(
        "Received CAN Message:\n  ID: {}\n  DLC: {}\n  Data: {}\n  Extended: {}\n  RTR: {}\n  Timestamp: {:.6}s",
        IdHex(frame.identifier),
        frame.length,
        frame.payload_hex(),
        frame.extended,
        frame.remote,
        frame.timestamp_secs
    );
}

/// Print frames until the source closes or `shutdown` resolves
///
/// Returns the number of frames received.
async fn listen<S: Future>(
    frames: &mut mpsc::Receiver<FrameEvent>,
    store: &mut FrameStore,
    keep: bool,
    shutdown: S,
) -> usize {
    // Created once so a signal arriving mid-print is not lost
    tokio::pin!(shutdown);

    let mut received = 0;
    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Some(frame) = frame else {
                    tracing::warn!("Frame source closed");
                    break;
                };
                print_frame(&frame);
                received += 1;
                if keep {
                    store.push(frame);
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Stopping CAN listener...");
                break;
            }
        }
    }
    received
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "canscope=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let can = SocketCanSource::open(&cli.interface)
        .with_context(|| format!("cannot listen on {}", cli.interface))?;
    let (tx, mut rx) = mpsc::channel(1024);
    source::spawn(can, tx)?;

    tracing::info!("Listening for CAN messages on {}...", cli.interface);
    if cli.no_store {
        tracing::info!("Incoming messages will only be logged.");
    } else {
        tracing::info!("Incoming messages will be stored.");
    }

    let mut store = FrameStore::default();
    let keep = !cli.no_store;
    listen(&mut rx, &mut store, keep, tokio::signal::ctrl_c()).await;

    if !cli.no_store {
        store.print_summary();
    }
    Ok(())
}
