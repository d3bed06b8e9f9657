//! Signed protocol messages, as exchanged on the wire.
use std::fmt;

use hotstuff_consensus_crypto::{keccak256::Keccak256, ByteFmt, Text, TextFmt};

use super::View;
use crate::{
    proto::validator as proto,
    validator::{Address, Signature},
};

/// Hash of signed data.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MsgHash(pub(crate) Keccak256);

impl MsgHash {
    /// Wraps an already computed digest.
    pub fn from_keccak(hash: Keccak256) -> Self {
        Self(hash)
    }
}

impl ByteFmt for MsgHash {
    fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        ByteFmt::decode(bytes).map(Self)
    }

    fn encode(&self) -> Vec<u8> {
        ByteFmt::encode(&self.0)
    }
}

impl TextFmt for MsgHash {
    fn decode(text: Text) -> anyhow::Result<Self> {
        text.strip("validator_msg:keccak256:")?
            .decode_hex()
            .map(Self)
    }

    fn encode(&self) -> String {
        format!(
            "validator_msg:keccak256:{}",
            hex::encode(ByteFmt::encode(&self.0))
        )
    }
}

impl fmt::Debug for MsgHash {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(&TextFmt::encode(self))
    }
}

/// Type tag of a protocol message.
///
/// The numeric order follows the protocol flow within a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum MsgCode {
    /// Replica to leader: start of a view, carries the replica's prepare QC.
    NewView = 0,
    /// Leader to replicas: the proposed node.
    Prepare = 1,
    /// Replica to leader: vote for the proposed node.
    PrepareVote = 2,
    /// Leader to replicas: the prepare QC.
    PreCommit = 3,
    /// Replica to leader: vote after locking.
    PreCommitVote = 4,
    /// Leader to replicas: the locked QC.
    Commit = 5,
    /// Replica to leader: vote carrying a committed seal.
    CommitVote = 6,
    /// Leader to replicas: the commit QC, the block is final.
    Decide = 7,
}

impl MsgCode {
    /// All codes, in protocol order.
    pub const ALL: [Self; 8] = [
        Self::NewView,
        Self::Prepare,
        Self::PrepareVote,
        Self::PreCommit,
        Self::PreCommitVote,
        Self::Commit,
        Self::CommitVote,
        Self::Decide,
    ];

    /// Short lowercase name, used as a metrics label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewView => "new_view",
            Self::Prepare => "prepare",
            Self::PrepareVote => "prepare_vote",
            Self::PreCommit => "pre_commit",
            Self::PreCommitVote => "pre_commit_vote",
            Self::Commit => "commit",
            Self::CommitVote => "commit_vote",
            Self::Decide => "decide",
        }
    }

    /// Whether the message is sent by replicas to the leader.
    pub fn is_vote(self) -> bool {
        matches!(
            self,
            Self::NewView | Self::PrepareVote | Self::PreCommitVote | Self::CommitVote
        )
    }
}

impl TryFrom<u32> for MsgCode {
    type Error = anyhow::Error;

    fn try_from(code: u32) -> anyhow::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| *c as u32 == code)
            .ok_or_else(|| anyhow::format_err!("unknown message code {code}"))
    }
}

impl fmt::Display for MsgCode {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

/// Hash covered by the signature of a message with the given code, view and
/// encoded payload.
pub fn signing_hash(code: MsgCode, view: View, payload: &[u8]) -> MsgHash {
    let data = proto::MessageSigningData {
        code: Some(code as u32),
        view: Some(hotstuff_protobuf::ProtoFmt::build(&view)),
        payload: Some(payload.to_vec()),
    };
    MsgHash(Keccak256::new(&prost::Message::encode_to_vec(&data)))
}

/// A signed protocol message.
///
/// WARNING: neither the signature nor the payload are guaranteed to be valid.
/// Use [`Message::recover_sender`] and [`Message::decode_payload`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Type tag of the payload.
    pub code: MsgCode,
    /// View the message was sent in.
    pub view: View,
    /// Encoded payload, see [`super::ConsensusMsg`].
    pub payload: Vec<u8>,
    /// Signature of the sender over [`Message::signing_hash`].
    pub signature: Signature,
    /// Seal over the committed block hash. Only present in `COMMIT_VOTE`.
    pub committed_seal: Option<Signature>,
}

impl Message {
    /// Hash covered by `signature`.
    pub fn signing_hash(&self) -> MsgHash {
        signing_hash(self.code, self.view, &self.payload)
    }

    /// Recovers the address of the sender from the signature.
    pub fn recover_sender(&self) -> anyhow::Result<Address> {
        self.signature.recover(&self.signing_hash())
    }

    /// Decodes the payload according to the message code.
    pub fn decode_payload(&self) -> anyhow::Result<super::ConsensusMsg> {
        super::ConsensusMsg::decode(self.code, &self.payload)
    }
}
