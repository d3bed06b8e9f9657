//! Quorum certificates.
use super::{signing_hash, Block, MsgCode, MsgHash, Node, NodeHash, View, Vote};
use crate::validator::{Address, Signature};

/// Aggregated proof that a quorum of validators signed the same
/// (view, code, node) triple.
///
/// The signatures of the individual votes are kept verbatim in
/// `committed_seals`: a vote signature is by construction a signature over
/// [`QuorumCert::seal_hash`]. For a commit certificate (code `COMMIT_VOTE`)
/// `committed_seals` holds the committed seals of the block instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuorumCert {
    /// View in which the votes were cast.
    pub view: View,
    /// Code of the aggregated votes.
    pub code: MsgCode,
    /// Hash of the node the votes are for.
    pub node: NodeHash,
    /// Leader that assembled the certificate.
    pub proposer: Address,
    /// Signature of `proposer` over the seal hash. `None` for a root certificate.
    pub seal: Option<Signature>,
    /// Signatures of the voters.
    pub committed_seals: Vec<Signature>,
}

impl QuorumCert {
    /// Unsigned certificate for the root node of `block`. Used when a
    /// replica holds no commit certificate for its chain head.
    pub fn root(block: &Block) -> Self {
        Self {
            view: View::new(block.number, 0),
            code: MsgCode::Decide,
            node: Node::root(block.clone()).hash(),
            proposer: block.proposer,
            seal: None,
            committed_seals: vec![],
        }
    }

    /// Whether this is a root certificate.
    pub fn is_root(&self) -> bool {
        self.seal.is_none()
    }

    /// Hash signed by the proposer seal and, for vote certificates, by every voter.
    pub fn seal_hash(&self) -> MsgHash {
        seal_hash(self.code, self.view, &self.node)
    }

    /// Orders certificates by view, preferring real certificates over root
    /// ones at the same view.
    pub fn rank(&self) -> (View, bool) {
        (self.view, !self.is_root())
    }
}

/// Signing hash of a vote with the given code and view for `node`.
pub fn seal_hash(code: MsgCode, view: View, node: &NodeHash) -> MsgHash {
    signing_hash(code, view, &hotstuff_protobuf::encode(&Vote { digest: *node }))
}
