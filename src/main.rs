//! Herald - cross-process Discord event bridge
//!
//! Runs a Discord bot on a dedicated worker thread and relays between it and
//! a line-oriented pipeline: outbound records are read from stdin, inbound
//! records are written to stdout, one JSON object per line.

mod bridge;
mod common;
mod config;
mod discord;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use bridge::{cycle_period, render_output, spawn_worker, Bridge, PendingRecords};
use config::{env::get_config_path, load_and_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries records, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Herald v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Poll interval: {:.2}s", config.discord.poll_interval);
    info!("  Queue capacity: {}", config.bridge.queue_capacity);

    let mut bridge = spawn_worker(&config)?;

    let mut ticker = tokio::time::interval(cycle_period(config.discord.poll_interval()));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = PendingRecords::new();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Err(e) = pending.push_line(&line) {
                        warn!("Skipping input line: {}", e);
                    }
                }
                Ok(None) => {
                    info!("Input closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    break;
                }
            },
            _ = ticker.tick() => {
                run_cycle(&mut bridge, &mut pending)?;
                if !bridge.is_worker_running() {
                    error!("Discord worker stopped");
                    break;
                }
            }
        }
    }

    // Hand over anything read since the last tick.
    if !pending.is_empty() {
        run_cycle(&mut bridge, &mut pending)?;
    }

    info!("Exiting...");
    // A pending stdin read would otherwise keep the runtime from shutting down.
    std::process::exit(0)
}

fn run_cycle(bridge: &mut Bridge, pending: &mut PendingRecords) -> Result<()> {
    let (messages, commands) = pending.take();
    let output = bridge.advance(messages, commands);

    for line in &output.logs {
        for text in line.as_str().lines().filter(|text| !text.is_empty()) {
            info!(target: "herald::worker", "{}", text);
        }
    }

    for line in render_output(&output)? {
        println!("{}", line);
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
