use std::time::Duration;

use hotstuff_consensus_roles::validator;

/// Reasons for rejecting a protocol message.
#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    /// The message or its payload is malformed.
    #[error("failed to decode message: {0:#}")]
    Decode(anyhow::Error),
    /// The signature doesn't recover.
    #[error("invalid message signature: {0:#}")]
    InvalidSignature(anyhow::Error),
    /// The signer is not a member of the validator set.
    #[error("message signed by non-validator {0}")]
    NonValidatorSigner(validator::Address),
    /// Message for a past view.
    #[error("old message (current view {current}, message view {view})")]
    OldMessage {
        current: validator::View,
        view: validator::View,
    },
    /// Message for a later round of the current height, or for the next height.
    /// Such messages are kept in the backlog.
    #[error("future message (current view {current}, message view {view})")]
    FutureMessage {
        current: validator::View,
        view: validator::View,
    },
    /// Message more than one height ahead.
    #[error("far future message (current view {current}, message view {view})")]
    FarFutureMessage {
        current: validator::View,
        view: validator::View,
    },
    /// Leader message signed by someone else than the proposer.
    #[error("message from {sender}, but the proposer is {proposer}")]
    NotFromProposer {
        proposer: validator::Address,
        sender: validator::Address,
    },
    /// Replica message received by a node which is not the proposer.
    #[error("message sent to a node which is not the proposer")]
    NotToProposer,
    /// The message refers to a different node than the one of the current view.
    #[error("digest mismatch (want {want:?}, got {got:?})")]
    InvalidDigest {
        want: Option<validator::NodeHash>,
        got: validator::NodeHash,
    },
    #[error("invalid quorum certificate: {0:#}")]
    InvalidQc(anyhow::Error),
    /// The proposed node doesn't extend the node of the high QC.
    #[error("proposal doesn't extend the high QC")]
    Extend,
    /// The proposed node conflicts with the lock and the high QC is not newer than the lock.
    #[error("proposal conflicts with the locked node")]
    SafeNode,
    #[error("invalid proposal: {0:#}")]
    InvalidProposal(anyhow::Error),
    /// The proposed block is not valid yet. The proposal is retried after the delay.
    #[error("future block, retrying in {0:?}")]
    FutureBlock(Duration),
    /// A committed seal is missing or signed by someone else than the sender.
    #[error("invalid committed seal: {0:#}")]
    InvalidCommittedSeal(anyhow::Error),
    /// The backend failed to process a block.
    #[error("backend failure: {0:#}")]
    Backend(anyhow::Error),
    /// Violated invariant of the replica itself. Stops the engine.
    #[error(transparent)]
    Internal(anyhow::Error),
}

impl Error {
    /// Whether the error is an expected consequence of view skew.
    pub(crate) fn is_view_skew(&self) -> bool {
        matches!(
            self,
            Self::OldMessage { .. } | Self::FutureMessage { .. } | Self::FarFutureMessage { .. }
        )
    }
}

impl From<validator::QcError> for Error {
    fn from(err: validator::QcError) -> Self {
        Self::InvalidQc(err.into())
    }
}
