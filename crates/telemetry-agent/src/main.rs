//! Telemetry Agent - Main Entry Point

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use telemetry_agent::{init_logging, runtime, AgentConfig, AgentContext, LogNotifier, SystemClock};
use tokio::sync::mpsc;
use tracing::info;
use uplink::{HttpTransport, Transport};
use vehicle_metrics::SimulatedProvider;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Configuration file (TOML); `TLM_*` environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sample and upload until interrupted
    Run,
    /// List every field the vehicle currently supplies
    Describe,
    /// Send one snapshot right away, bypassing the queue
    SendOnce,
    /// Print agent status as JSON
    Status,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AgentConfig::load(args.config.as_deref()).context("loading configuration")?;
    init_logging(&config)?;

    info!("=== Telemetry Agent v{} ===", env!("CARGO_PKG_VERSION"));

    let tag = config.vehicle_type.clone().unwrap_or_default();
    let provider = SimulatedProvider::new(&tag);
    let mut ctx = AgentContext::new(config, provider, SystemClock, Box::new(LogNotifier))?;
    let transport = Arc::new(HttpTransport::new()?);

    match args.command {
        Commands::Run => {
            // No live vehicle bus in the simulated setup; keep the channel open
            let (_vehicle_tx, vehicle_rx) = mpsc::unbounded_channel();
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for ctrl-c: {}", e);
                    std::future::pending::<()>().await;
                }
            };
            let ctx = runtime::run(ctx, transport, vehicle_rx, shutdown).await?;
            println!("{}", serde_json::to_string_pretty(&ctx.status())?);
        }
        Commands::Describe => {
            print!("{}", ctx.describe_current());
        }
        Commands::SendOnce => {
            let request = ctx.send_once()?;
            let status = transport.send(request).await?;
            if !(200..300).contains(&status) {
                bail!("endpoint rejected snapshot with status {}", status);
            }
            println!("Snapshot accepted ({})", status);
        }
        Commands::Status => {
            println!("{}", serde_json::to_string_pretty(&ctx.status())?);
        }
    }

    Ok(())
}
