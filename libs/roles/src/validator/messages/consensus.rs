//! Payloads of the protocol messages.
use anyhow::Context as _;
use hotstuff_protobuf::{decode, encode};

use super::{MsgCode, Node, NodeHash, QuorumCert};

/// `NEW_VIEW` payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewView {
    /// Highest prepare QC known to the replica.
    pub prepare_qc: QuorumCert,
}

/// `PREPARE` and `PRE_COMMIT` payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proposal {
    /// Proposed node.
    pub node: Node,
    /// High QC the node extends (`PREPARE`) or the prepare QC of the node (`PRE_COMMIT`).
    pub qc: QuorumCert,
}

/// Payload of the vote messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Vote {
    /// Hash of the node voted for.
    pub digest: NodeHash,
}

/// `COMMIT` payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    /// Locked QC of the leader.
    pub locked_qc: QuorumCert,
}

/// `DECIDE` payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decide {
    /// Commit QC of the decided node.
    pub commit_qc: QuorumCert,
}

/// Decoded payload of a protocol message, one variant per [`MsgCode`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ConsensusMsg {
    NewView(NewView),
    Prepare(Proposal),
    PrepareVote(Vote),
    PreCommit(Proposal),
    PreCommitVote(Vote),
    Commit(Commit),
    CommitVote(Vote),
    Decide(Decide),
}

impl ConsensusMsg {
    /// Code of the message.
    pub fn code(&self) -> MsgCode {
        match self {
            Self::NewView(_) => MsgCode::NewView,
            Self::Prepare(_) => MsgCode::Prepare,
            Self::PrepareVote(_) => MsgCode::PrepareVote,
            Self::PreCommit(_) => MsgCode::PreCommit,
            Self::PreCommitVote(_) => MsgCode::PreCommitVote,
            Self::Commit(_) => MsgCode::Commit,
            Self::CommitVote(_) => MsgCode::CommitVote,
            Self::Decide(_) => MsgCode::Decide,
        }
    }

    /// Encodes the payload.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::NewView(x) => encode(x),
            Self::Prepare(x) | Self::PreCommit(x) => encode(x),
            Self::PrepareVote(x) | Self::PreCommitVote(x) | Self::CommitVote(x) => encode(x),
            Self::Commit(x) => encode(x),
            Self::Decide(x) => encode(x),
        }
    }

    /// Decodes a payload of a message with the given code.
    pub fn decode(code: MsgCode, payload: &[u8]) -> anyhow::Result<Self> {
        Ok(match code {
            MsgCode::NewView => Self::NewView(decode(payload).context("NewView")?),
            MsgCode::Prepare => Self::Prepare(decode(payload).context("Prepare")?),
            MsgCode::PrepareVote => Self::PrepareVote(decode(payload).context("PrepareVote")?),
            MsgCode::PreCommit => Self::PreCommit(decode(payload).context("PreCommit")?),
            MsgCode::PreCommitVote => {
                Self::PreCommitVote(decode(payload).context("PreCommitVote")?)
            }
            MsgCode::Commit => Self::Commit(decode(payload).context("Commit")?),
            MsgCode::CommitVote => Self::CommitVote(decode(payload).context("CommitVote")?),
            MsgCode::Decide => Self::Decide(decode(payload).context("Decide")?),
        })
    }
}
