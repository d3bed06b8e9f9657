//! Checks shared by the message handlers.
use anyhow::Context as _;
use hotstuff_consensus_roles::validator;

use super::{Core, Error};
use crate::backend::CheckpointStatus;

impl Core {
    /// Classifies the view of a message against the current view.
    ///
    /// `DECIDE` messages from an earlier round of the current height are
    /// still processed: the block they certify is final regardless of the round.
    pub(crate) fn check_view(
        &self,
        code: validator::MsgCode,
        view: validator::View,
    ) -> Result<(), Error> {
        let Some(current) = self.current.as_ref().map(|rs| rs.view()) else {
            // Not started yet, everything is in the future.
            return Err(Error::FutureMessage {
                current: validator::View::default(),
                view,
            });
        };
        if view.height > current.height + 1 {
            return Err(Error::FarFutureMessage { current, view });
        }
        if view.height == current.height + 1
            || (view.height == current.height && view.round > current.round)
        {
            return Err(Error::FutureMessage { current, view });
        }
        if view.height < current.height
            || (view.round < current.round && code != validator::MsgCode::Decide)
        {
            return Err(Error::OldMessage { current, view });
        }
        Ok(())
    }

    /// Whether `sender` may send messages for `view`, a view ahead of the
    /// current one. The validator set following an epoch boundary is
    /// unknown until the boundary block is committed, so anyone may send
    /// messages for that height.
    pub(crate) fn may_participate(
        &self,
        sender: &validator::Address,
        view: validator::View,
    ) -> bool {
        if self.validators.contains(sender) {
            return true;
        }
        let Some(current) = self.current.as_ref().map(|rs| rs.view()) else {
            return false;
        };
        view.height == current.height + 1
            && self.backend.check_point(current.height) == CheckpointStatus::EpochBoundary
    }

    /// Validator set the certificate has to be verified against.
    ///
    /// The certificate of the first block after an epoch boundary was produced
    /// by the validators of the previous epoch.
    pub(crate) fn qc_validators(&self, qc: &validator::QuorumCert) -> validator::ValidatorSet {
        let is_head = self
            .last
            .as_ref()
            .is_some_and(|(block, _)| block.number == qc.view.height);
        if is_head && self.backend.check_point(qc.view.height) == CheckpointStatus::EpochBoundary {
            return self.backend.validators(false);
        }
        self.validators.clone()
    }

    /// Verifies a certificate carried by a message.
    ///
    /// Root certificates are only valid for the chain head. Commit
    /// certificates are checked against the block of the chain head or the
    /// candidate node, whichever is at their height.
    pub(crate) fn check_qc(&self, qc: &validator::QuorumCert) -> Result<(), Error> {
        let last = self.last_block()?;
        if qc.is_root() {
            if *qc != validator::QuorumCert::root(last) {
                return Err(Error::InvalidQc(anyhow::anyhow!(
                    "root certificate doesn't match the chain head"
                )));
            }
            return Ok(());
        }
        let vals = self.qc_validators(qc);
        match qc.code {
            validator::MsgCode::PrepareVote | validator::MsgCode::PreCommitVote => {
                validator::verify_qc(qc, &vals)?;
            }
            validator::MsgCode::CommitVote => {
                let block = if qc.view.height == last.number {
                    last.hash()
                } else {
                    let node = self
                        .rs()?
                        .node
                        .as_ref()
                        .filter(|node| node.hash() == qc.node)
                        .context("commit certificate for an unknown node")
                        .map_err(Error::InvalidQc)?;
                    node.block.hash()
                };
                validator::verify_commit_qc(qc, &block, &vals)?;
            }
            code => {
                return Err(Error::InvalidQc(anyhow::anyhow!(
                    "{code} is not a certificate code"
                )));
            }
        }
        Ok(())
    }

    /// Whether `node` extends the node certified by `high_qc`. A node
    /// certified at the current height may be proposed again as is.
    pub(crate) fn extends(
        &self,
        node: &validator::Node,
        high_qc: &validator::QuorumCert,
    ) -> Result<(), Error> {
        let height = self.rs()?.view().height;
        if node.parent == high_qc.node {
            return Ok(());
        }
        if high_qc.view.height == height && node.hash() == high_qc.node {
            return Ok(());
        }
        Err(Error::Extend)
    }

    /// Whether voting for `node` can't contradict the lock of the replica.
    ///
    /// The proposal is safe if the replica is not locked, if the node is the
    /// locked node or extends it, or if `high_qc` is newer than the lock. A
    /// lock on an already finalized height doesn't constrain anything.
    pub(crate) fn safe_node(
        &self,
        node: &validator::Node,
        high_qc: &validator::QuorumCert,
    ) -> Result<(), Error> {
        let rs = self.rs()?;
        let Some(locked) = &rs.locked_qc else {
            return Ok(());
        };
        if locked.view.height < rs.view().height {
            return Ok(());
        }
        if node.hash() == locked.node || node.parent == locked.node {
            return Ok(());
        }
        if high_qc.view > locked.view {
            return Ok(());
        }
        Err(Error::SafeNode)
    }
}
