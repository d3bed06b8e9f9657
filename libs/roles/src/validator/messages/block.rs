//! Blocks (proposals) decided by the consensus.
use std::fmt;

use hotstuff_consensus_crypto::{keccak256::Keccak256, ByteFmt, Text, TextFmt};

use super::Height;
use crate::validator::{Address, Signature};

/// Hash of a block. Covers everything but the committed seals.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockHash(pub(crate) Keccak256);

impl BlockHash {
    /// Hash of "no block", used as the parent of the first block.
    pub const ZERO: Self = Self(Keccak256::from_bytes([0; 32]));
}

impl ByteFmt for BlockHash {
    fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        ByteFmt::decode(bytes).map(Self)
    }

    fn encode(&self) -> Vec<u8> {
        ByteFmt::encode(&self.0)
    }
}

impl TextFmt for BlockHash {
    fn decode(text: Text) -> anyhow::Result<Self> {
        text.strip("block:keccak256:")?.decode_hex().map(Self)
    }

    fn encode(&self) -> String {
        format!("block:keccak256:{}", hex::encode(ByteFmt::encode(&self.0)))
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(&TextFmt::encode(self))
    }
}

/// A block proposal.
///
/// The consensus treats the payload as opaque; executing it is the job
/// of the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// Height of the block.
    pub number: Height,
    /// Hash of the previous block.
    pub parent: BlockHash,
    /// Validator that produced the block.
    pub proposer: Address,
    /// Opaque block content.
    pub payload: Vec<u8>,
    /// Seals of the validators that committed the block. Empty until the
    /// block has been decided.
    pub committed_seals: Vec<Signature>,
}

impl Block {
    /// Hash of the block header. Sealing a block doesn't change its hash.
    pub fn hash(&self) -> BlockHash {
        let mut header = hotstuff_protobuf::ProtoFmt::build(self);
        header.committed_seals.clear();
        BlockHash(Keccak256::new(&prost::Message::encode_to_vec(&header)))
    }

    /// Returns a copy of this block carrying the given committed seals.
    pub fn with_seals(&self, seals: Vec<Signature>) -> Self {
        Self {
            committed_seals: seals,
            ..self.clone()
        }
    }
}
