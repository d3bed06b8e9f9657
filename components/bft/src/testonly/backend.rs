use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

use anyhow::Context as _;
use hotstuff_consensus_roles::validator;
use tokio::sync::watch;

use super::Network;
use crate::{Backend, CheckpointStatus, VerifyError};

#[derive(Debug)]
struct Chain {
    blocks: Vec<validator::Block>,
    validators: validator::ValidatorSet,
    /// Set in force before the last epoch boundary.
    prev_validators: validator::ValidatorSet,
}

/// Backend keeping the chain in memory and exchanging messages over a [`Network`].
///
/// Once it commits a block it asks its engine to decide a block for the next height,
/// so an engine keeps producing blocks as long as it runs.
#[derive(Debug)]
pub struct InMemoryBackend {
    address: validator::Address,
    network: Arc<Network>,
    chain: Mutex<Chain>,
    /// Validator sets taking effect after the given heights.
    epochs: BTreeMap<validator::Height, validator::ValidatorSet>,
    head: watch::Sender<validator::Height>,
    commits: AtomicUsize,
    /// Blocks reported as too early by the next `verify` call.
    early: Mutex<HashMap<validator::BlockHash, Duration>>,
}

impl InMemoryBackend {
    /// Backend of the validator `address` with a chain consisting of `genesis` only.
    pub fn new(
        address: validator::Address,
        network: Arc<Network>,
        genesis: validator::Block,
        validators: validator::ValidatorSet,
    ) -> Self {
        let (head, _) = watch::channel(genesis.number);
        Self {
            address,
            network,
            chain: Mutex::new(Chain {
                blocks: vec![genesis],
                prev_validators: validators.clone(),
                validators,
            }),
            epochs: BTreeMap::new(),
            head,
            commits: AtomicUsize::new(0),
            early: Mutex::default(),
        }
    }

    /// Makes `validators` the validator set of every height after `height`.
    pub fn with_epoch(
        mut self,
        height: validator::Height,
        validators: validator::ValidatorSet,
    ) -> Self {
        self.epochs.insert(height, validators);
        self
    }

    fn chain(&self) -> MutexGuard<'_, Chain> {
        self.chain.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Committed blocks, starting with genesis.
    pub fn blocks(&self) -> Vec<validator::Block> {
        self.chain().blocks.clone()
    }

    /// Number of blocks committed through [`Backend::commit`].
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Waits until the chain reaches `height`.
    pub async fn wait_for_height(&self, height: validator::Height) {
        let mut head = self.head.subscribe();
        // The sender lives as long as `self`.
        let _ = head.wait_for(|h| *h >= height).await;
    }

    /// Makes the next verification of `block` ask for a retry after `delay`.
    pub fn delay_block(&self, block: &validator::Block, delay: Duration) {
        self.early
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(block.hash(), delay);
    }

    /// Block the local validator wants to propose on top of the chain head.
    pub fn next_block(&self) -> validator::Block {
        let chain = self.chain();
        let head = chain.blocks.last().unwrap_or_else(|| unreachable!("chain is never empty"));
        validator::Block {
            number: head.number + 1,
            parent: head.hash(),
            proposer: self.address,
            payload: format!("block {} by {}", head.number + 1, self.address).into_bytes(),
            committed_seals: vec![],
        }
    }
}

#[async_trait::async_trait]
impl Backend for InMemoryBackend {
    fn address(&self) -> validator::Address {
        self.address
    }

    fn validators(&self, for_mining: bool) -> validator::ValidatorSet {
        let chain = self.chain();
        if for_mining {
            chain.validators.clone()
        } else {
            chain.prev_validators.clone()
        }
    }

    fn last_proposal(&self) -> Option<(validator::Block, validator::Address)> {
        let chain = self.chain();
        let head = chain.blocks.last()?;
        Some((head.clone(), head.proposer))
    }

    fn check_point(&self, height: validator::Height) -> CheckpointStatus {
        if self.epochs.contains_key(&height) {
            CheckpointStatus::EpochBoundary
        } else {
            CheckpointStatus::Regular
        }
    }

    async fn broadcast(
        &self,
        validators: &validator::ValidatorSet,
        payload: Vec<u8>,
    ) -> anyhow::Result<()> {
        for to in validators.iter() {
            self.network.deliver(&self.address, to, payload.clone());
        }
        Ok(())
    }

    async fn unicast(
        &self,
        validators: &validator::ValidatorSet,
        payload: Vec<u8>,
    ) -> anyhow::Result<()> {
        self.network
            .deliver(&self.address, &validators.proposer(), payload);
        Ok(())
    }

    async fn gossip(
        &self,
        validators: &validator::ValidatorSet,
        payload: Vec<u8>,
    ) -> anyhow::Result<()> {
        for to in validators.iter().filter(|v| **v != self.address) {
            self.network.deliver(&self.address, to, payload.clone());
        }
        Ok(())
    }

    async fn verify(&self, block: &validator::Block, is_commit: bool) -> Result<(), VerifyError> {
        let early = self
            .early
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&block.hash());
        if let Some(delay) = early {
            return Err(VerifyError::FutureBlock(delay));
        }
        let chain = self.chain();
        let head = chain.blocks.last().context("empty chain")?;
        if block.number != head.number + 1 || block.parent != head.hash() {
            return Err(
                anyhow::anyhow!("block {} doesn't extend the chain head", block.number).into(),
            );
        }
        if !chain.validators.contains(&block.proposer) {
            return Err(
                anyhow::anyhow!("block proposed by non-validator {}", block.proposer).into(),
            );
        }
        if is_commit {
            validator::verify_committed_seals(
                &validator::wrap_committed_hash(&block.hash()),
                &block.committed_seals,
                &chain.validators,
            )
            .context("committed seals")?;
        }
        Ok(())
    }

    async fn pre_commit(
        &self,
        block: &validator::Block,
        seals: Vec<validator::Signature>,
    ) -> anyhow::Result<validator::Block> {
        Ok(block.with_seals(seals))
    }

    async fn commit(&self, block: validator::Block) -> anyhow::Result<()> {
        let number = block.number;
        {
            let mut chain = self.chain();
            let head = chain.blocks.last().context("empty chain")?;
            anyhow::ensure!(
                number == head.number + 1 && block.parent == head.hash(),
                "block {number} doesn't extend the chain head"
            );
            chain.blocks.push(block);
            if let Some(next) = self.epochs.get(&number) {
                let prev = std::mem::replace(&mut chain.validators, next.clone());
                chain.prev_validators = prev;
            }
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.head.send_replace(number);
        self.network.request(&self.address, self.next_block());
        Ok(())
    }
}
