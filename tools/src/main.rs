//! Runs a localnet of HotStuff validators until a given height is finalized.
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use hotstuff_consensus_tools::LocalnetConfig;
use tracing_subscriber::EnvFilter;

/// Command line arguments.
#[derive(Debug, Parser)]
struct Args {
    /// Path to a JSON file with the localnet configuration.
    /// Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of validators.
    #[arg(long)]
    validators: Option<usize>,
    /// Indices of offline validators.
    #[arg(long, value_delimiter = ',')]
    offline: Option<Vec<usize>>,
    /// Height to finalize.
    #[arg(long)]
    blocks: Option<u64>,
    /// Base round timeout in milliseconds.
    #[arg(long)]
    request_timeout_ms: Option<u64>,
    /// Print the effective configuration and exit.
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn config(&self) -> anyhow::Result<LocalnetConfig> {
        let mut cfg = match &self.config {
            Some(path) => LocalnetConfig::read(path).context("LocalnetConfig::read()")?,
            None => LocalnetConfig::default(),
        };
        if let Some(n) = self.validators {
            cfg.validators = n;
        }
        if let Some(offline) = &self.offline {
            cfg.offline.clone_from(offline);
        }
        if let Some(blocks) = self.blocks {
            cfg.blocks = blocks;
        }
        if let Some(timeout) = self.request_timeout_ms {
            cfg.request_timeout_ms = timeout;
        }
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    tracing::trace!(?args, "Starting localnet");

    let cfg = args.config()?;
    if args.print_config {
        tracing::info!("{}", hotstuff_consensus_tools::encode_json(&cfg)?);
        return Ok(());
    }
    let report = hotstuff_consensus_tools::run(&cfg).await?;
    for block in &report.chain {
        tracing::info!("block {} by {}: {:?}", block.number, block.proposer, block.hash());
    }
    Ok(())
}
