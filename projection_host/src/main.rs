//! `parity-projection`: run the parity projection over a batch of events.
//!
//! Loads the host configuration, appends the input events to the store,
//! runs one session and prints the resulting state, hash and summary.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use parity_projection::hashing::canonical_serialize;
use projection_host::batch::{parse_inputs, run_batch};
use projection_host::config::HostConfig;

#[derive(Debug, Parser)]
#[command(name = "parity-projection", version, about)]
struct Cli {
    /// Host configuration (YAML). Defaults reproduce the declared projection.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON array of `{stream, type, data}` objects to append before running.
    #[arg(long)]
    events: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => HostConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => HostConfig::default(),
    };

    let raw = fs::read_to_string(&cli.events)
        .with_context(|| format!("reading events {}", cli.events.display()))?;
    let inputs = parse_inputs(&raw).context("events file must be a JSON array")?;

    let outcome = run_batch(&config, inputs).context("running projection")?;

    println!(
        "state:   {}",
        String::from_utf8_lossy(&canonical_serialize(&outcome.state))
    );
    println!("hash:    {}", outcome.hash);
    println!("summary: {}", serde_json::to_string(&outcome.summary)?);
    Ok(())
}
