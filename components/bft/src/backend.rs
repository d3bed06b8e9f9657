//! Interface between the consensus core and the node hosting it.
use std::time::Duration;

use hotstuff_consensus_roles::validator;

/// Outcome of [`Backend::verify`] for a block which is not acceptable (yet).
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// The block is valid but its timestamp lies in the future.
    /// The proposal should be retried after the given delay.
    #[error("future block, retry in {0:?}")]
    FutureBlock(Duration),
    /// The block is invalid.
    #[error(transparent)]
    Invalid(#[from] anyhow::Error),
}

/// Whether a height closes an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointStatus {
    /// Validator set at the next height is the same as at this one.
    Regular,
    /// The validator set changes after this height.
    EpochBoundary,
}

/// Services provided by the node to the consensus core.
///
/// Sending methods are invoked from background tasks and must not assume
/// they run on the event loop.
#[async_trait::async_trait]
pub trait Backend: std::fmt::Debug + Send + Sync + 'static {
    /// Address of the local validator.
    fn address(&self) -> validator::Address;
    /// Validator set of the next height. With `for_mining == false` the set
    /// in force before the last epoch boundary is returned instead.
    fn validators(&self, for_mining: bool) -> validator::ValidatorSet;
    /// The head of the local chain together with its proposer,
    /// or `None` if the chain is not ready yet.
    fn last_proposal(&self) -> Option<(validator::Block, validator::Address)>;
    /// Classifies the given height.
    fn check_point(&self, height: validator::Height) -> CheckpointStatus;

    /// Sends the payload to every validator in the set, including the sender itself.
    async fn broadcast(
        &self,
        validators: &validator::ValidatorSet,
        payload: Vec<u8>,
    ) -> anyhow::Result<()>;
    /// Sends the payload to the proposer of the set.
    async fn unicast(
        &self,
        validators: &validator::ValidatorSet,
        payload: Vec<u8>,
    ) -> anyhow::Result<()>;
    /// Sends the payload to every validator in the set except the sender.
    async fn gossip(
        &self,
        validators: &validator::ValidatorSet,
        payload: Vec<u8>,
    ) -> anyhow::Result<()>;

    /// Validates a proposed block. With `is_commit` the committed seals
    /// attached to the block are validated as well.
    async fn verify(&self, block: &validator::Block, is_commit: bool) -> Result<(), VerifyError>;
    /// Attaches the committed seals to the block, producing the block to commit.
    async fn pre_commit(
        &self,
        block: &validator::Block,
        seals: Vec<validator::Signature>,
    ) -> anyhow::Result<validator::Block>;
    /// Appends a sealed block to the chain.
    async fn commit(&self, block: validator::Block) -> anyhow::Result<()>;
}
