//! State of the current view.
use hotstuff_consensus_roles::validator;

use crate::{message_set::MessageSet, request_set::Request};

/// Progress of a view. Only ever increases within a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum State {
    /// Waiting for a high QC (leader) or a proposal (replica).
    AcceptRequest,
    /// The leader collected a quorum of `NEW_VIEW`, or the replica accepted a proposal.
    HighQc,
    /// A prepare QC exists for the node.
    Prepared,
    /// Locked on the node.
    PreCommitted,
    /// Voted to commit (replica) or assembled the commit QC (leader).
    Committed,
}

/// Everything a replica tracks within a single view.
#[derive(Debug)]
pub(crate) struct RoundState {
    view: validator::View,
    state: State,
    /// Candidate node of this height. Survives round changes.
    pub(crate) node: Option<validator::Node>,
    locked: bool,
    /// Whether the local node, as the leader, has sent its `PREPARE`.
    pub(crate) proposed: bool,
    /// Block the local node wants decided at this height.
    pub(crate) pending_request: Option<Request>,
    /// `DECIDE` received before the replica locked, with its sender.
    pub(crate) early_decide: Option<(validator::Address, validator::Message)>,

    pub(crate) new_views: MessageSet<validator::QuorumCert>,
    pub(crate) prepare_votes: MessageSet<validator::Signature>,
    pub(crate) pre_commit_votes: MessageSet<validator::Signature>,
    /// Committed seals, not vote signatures.
    pub(crate) commit_votes: MessageSet<validator::Signature>,

    pub(crate) high_qc: Option<validator::QuorumCert>,
    pub(crate) prepare_qc: validator::QuorumCert,
    pub(crate) locked_qc: Option<validator::QuorumCert>,
    pub(crate) committed_qc: validator::QuorumCert,
}

impl RoundState {
    /// First view of a height. `anchor` certifies the chain head: either its
    /// commit QC or its root QC.
    pub(crate) fn new_height(
        view: validator::View,
        anchor: validator::QuorumCert,
        pending_request: Option<Request>,
    ) -> Self {
        Self {
            view,
            state: State::AcceptRequest,
            node: None,
            locked: false,
            proposed: false,
            pending_request,
            early_decide: None,
            new_views: MessageSet::new(view),
            prepare_votes: MessageSet::new(view),
            pre_commit_votes: MessageSet::new(view),
            commit_votes: MessageSet::new(view),
            high_qc: None,
            prepare_qc: anchor.clone(),
            locked_qc: (!anchor.is_root()).then(|| anchor.clone()),
            committed_qc: anchor,
        }
    }

    /// Next view at the same height. The candidate node, the lock and the
    /// certificates carry over, the vote collections start empty.
    pub(crate) fn round_change(view: validator::View, prev: RoundState) -> Self {
        Self {
            view,
            state: State::AcceptRequest,
            node: prev.node,
            locked: prev.locked,
            proposed: false,
            pending_request: prev.pending_request,
            early_decide: prev.early_decide,
            new_views: MessageSet::new(view),
            prepare_votes: MessageSet::new(view),
            pre_commit_votes: MessageSet::new(view),
            commit_votes: MessageSet::new(view),
            high_qc: None,
            prepare_qc: prev.prepare_qc,
            locked_qc: prev.locked_qc,
            committed_qc: prev.committed_qc,
        }
    }

    pub(crate) fn view(&self) -> validator::View {
        self.view
    }

    pub(crate) fn state(&self) -> State {
        self.state
    }

    /// Advances the state. Attempts to move it backwards are ignored.
    pub(crate) fn set_state(&mut self, state: State) {
        if state < self.state {
            tracing::debug!(
                "HotStuff replica - ignoring state regression {:?} -> {state:?} in view {}",
                self.state,
                self.view
            );
            return;
        }
        self.state = state;
    }

    /// Replaces the candidate node. Replacing it with a different node
    /// releases the node lock.
    pub(crate) fn set_node(&mut self, node: validator::Node) {
        if self.node.as_ref().map(validator::Node::hash) != Some(node.hash()) {
            self.locked = false;
        }
        self.node = Some(node);
    }

    /// Locks on the candidate node with its prepare QC.
    pub(crate) fn lock(&mut self, qc: validator::QuorumCert) {
        self.prepare_qc = qc.clone();
        self.locked_qc = Some(qc);
        self.locked = true;
    }

    #[cfg(test)]
    pub(crate) fn is_locked(&self) -> bool {
        self.locked
    }

    /// Hash of the candidate node, if any.
    pub(crate) fn node_hash(&self) -> Option<validator::NodeHash> {
        self.node.as_ref().map(validator::Node::hash)
    }

    /// Node the replica is locked on at the current height.
    pub(crate) fn locked_node(&self) -> Option<validator::NodeHash> {
        self.locked_qc
            .as_ref()
            .filter(|qc| self.locked && qc.view.height == self.view.height)
            .map(|qc| qc.node)
    }
}
