//! Runs a network of validators inside a single process.
use std::{sync::Arc, time::Instant};

use anyhow::Context as _;
use hotstuff_consensus_bft::{
    create_event_channel,
    testonly::{Behavior, InMemoryBackend, Network},
    Config,
};
use hotstuff_consensus_roles::validator;
use rand::{rngs::StdRng, SeedableRng as _};

use crate::LocalnetConfig;

/// Outcome of a localnet run.
#[derive(Debug, Clone)]
pub struct Report {
    /// Chain of the first honest validator, starting with genesis.
    pub chain: Vec<validator::Block>,
    /// Time it took to finalize the requested blocks.
    pub elapsed: std::time::Duration,
}

/// Runs the validators until every online one has finalized `cfg.blocks`
/// blocks, and checks that they agree on the chain.
pub async fn run(cfg: &LocalnetConfig) -> anyhow::Result<Report> {
    cfg.validate().context("validate()")?;
    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let setup = validator::testonly::Setup::new(&mut rng, cfg.validators);
    let validators =
        validator::ValidatorSet::new(setup.validators.iter().copied(), cfg.proposer_policy)
            .context("ValidatorSet::new()")?;
    let network = Arc::new(Network::default());

    let mut nodes = vec![];
    for (i, key) in setup.keys.iter().enumerate() {
        let behavior = if cfg.offline.contains(&i) {
            Behavior::Offline
        } else {
            Behavior::Honest
        };
        let backend = Arc::new(InMemoryBackend::new(
            key.address(),
            network.clone(),
            setup.genesis.clone(),
            validators.clone(),
        ));
        let (events, receiver) = create_event_channel();
        network.connect(key.address(), events, behavior);
        let mut config = Config::new(key.clone());
        config.request_timeout = cfg.request_timeout();
        config.block_period = cfg.block_period();
        tracing::info!("validator {i}: {} ({behavior:?})", key.address());
        nodes.push((key.address(), backend, config, receiver, behavior));
    }

    let started = Instant::now();
    let mut honest = vec![];
    let mut tasks = vec![];
    for (address, backend, config, receiver, behavior) in nodes {
        network.request(&address, backend.next_block());
        tasks.push(tokio::spawn(config.run(backend.clone(), receiver)));
        if behavior == Behavior::Honest {
            honest.push(backend);
        }
    }

    let deadline = std::time::Duration::from_secs(cfg.deadline_secs);
    let res = tokio::time::timeout(deadline, async {
        for backend in &honest {
            backend.wait_for_height(cfg.blocks).await;
        }
    })
    .await;
    let elapsed = started.elapsed();
    network.shutdown();
    for task in tasks {
        task.await.context("validator task panicked")??;
    }
    res.with_context(|| format!("height {} not reached in {deadline:?}", cfg.blocks))?;

    let chains: Vec<_> = honest.iter().map(|backend| backend.blocks()).collect();
    let first = chains.first().context("no honest validators")?;
    for (i, chain) in chains.iter().enumerate() {
        let common = chain.len().min(first.len());
        for (a, b) in chain[..common].iter().zip(&first[..common]) {
            anyhow::ensure!(
                a.hash() == b.hash(),
                "honest validator {i} diverged at height {}",
                a.number
            );
        }
    }
    tracing::info!(
        "finalized {} blocks in {elapsed:?}",
        first.len().saturating_sub(1)
    );
    Ok(Report {
        chain: first.clone(),
        elapsed,
    })
}
