//! Links of the chain that the validators vote on.
use std::fmt;

use hotstuff_consensus_crypto::{keccak256::Keccak256, ByteFmt, Text, TextFmt};

use super::{Block, BlockHash};

/// Hash of a [`Node`].
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHash(pub(crate) Keccak256);

impl NodeHash {
    /// Parent of a root node.
    pub const ZERO: Self = Self(Keccak256::from_bytes([0; 32]));
}

impl ByteFmt for NodeHash {
    fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        ByteFmt::decode(bytes).map(Self)
    }

    fn encode(&self) -> Vec<u8> {
        ByteFmt::encode(&self.0)
    }
}

impl TextFmt for NodeHash {
    fn decode(text: Text) -> anyhow::Result<Self> {
        text.strip("node:keccak256:")?.decode_hex().map(Self)
    }

    fn encode(&self) -> String {
        format!("node:keccak256:{}", hex::encode(ByteFmt::encode(&self.0)))
    }
}

impl fmt::Debug for NodeHash {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(&TextFmt::encode(self))
    }
}

/// A link of the node chain: a block together with the hash of the node it extends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    /// Hash of the node this one extends.
    pub parent: NodeHash,
    /// The proposed block.
    pub block: Block,
}

impl Node {
    /// Root node of `block`: anchors the node chain at a block for which
    /// no commit certificate is known.
    pub fn root(block: Block) -> Self {
        Self {
            parent: NodeHash::ZERO,
            block,
        }
    }

    /// Hash of the node.
    pub fn hash(&self) -> NodeHash {
        Self::hash_of(&self.parent, &self.block.hash())
    }

    /// Hash of a node with the given parent and block hash.
    pub fn hash_of(parent: &NodeHash, block: &BlockHash) -> NodeHash {
        NodeHash(Keccak256::concat([
            parent.0.as_bytes().as_slice(),
            block.0.as_bytes().as_slice(),
        ]))
    }
}
