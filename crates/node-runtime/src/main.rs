//! # Gossip Simulation
//!
//! Runs one simulated network to completion and prints the per-node
//! statistics as JSON on stdout.
//!
//! ## Startup Sequence
//!
//! 1. Install the tracing subscriber (`RUST_LOG`, default `info`)
//! 2. Load configuration from `GL_*` environment variables
//! 3. Build the topology and assign roles
//! 4. Run until the configured duration, then stop every node
//! 5. Print the report

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use node_runtime::{Simulation, SimulationConfig};

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;

    let config = SimulationConfig::from_env().context("invalid simulation configuration")?;
    let mut simulation = Simulation::new(config).context("failed to build simulation")?;
    let report = simulation.run();

    info!(
        seconds = report.simulated_seconds,
        events = report.stats.events_processed,
        blocks = report.stats.blocks_minted,
        messages = report.traffic.messages_sent,
        mean_propagation = report.mean_propagation_time(),
        timeouts = report.total_block_timeouts(),
        "Simulation finished"
    );

    let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
    println!("{json}");
    Ok(())
}
