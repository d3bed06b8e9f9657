//! `COMMIT` and `COMMIT_VOTE` handling.
use hotstuff_consensus_roles::validator;

use super::{Core, Error, Target};
use crate::round_state::State;

impl Core {
    /// Accepts the locked QC of the leader and sends a commit vote carrying
    /// the committed seal of the block.
    pub(crate) async fn on_commit(
        &mut self,
        sender: validator::Address,
        msg: validator::Commit,
    ) -> Result<(), Error> {
        // ----------- Checking origin of the message --------------

        self.check_from_proposer(sender)?;
        let qc = msg.locked_qc;
        if self.is_proposer() {
            return self.send_vote(validator::MsgCode::CommitVote, qc.node);
        }

        // ----------- Checking the message --------------

        let rs = self.rs()?;
        let view = rs.view();
        let want = rs.node_hash();
        if want != Some(qc.node) {
            return Err(Error::InvalidDigest { want, got: qc.node });
        }
        if qc.code != validator::MsgCode::PrepareVote || qc.view != view {
            return Err(Error::InvalidQc(anyhow::anyhow!(
                "expected a prepare QC of view {view}"
            )));
        }
        self.check_qc(&qc)?;

        // ----------- All checks finished. Now we process the message. --------------

        let rs = self.rs_mut()?;
        if rs.state() < State::PreCommitted {
            // The PRE_COMMIT was missed, the locked QC proves it.
            rs.lock(qc.clone());
        }
        rs.set_state(State::Committed);
        self.send_vote(validator::MsgCode::CommitVote, qc.node)?;
        self.replay_early_decide()
    }

    /// Collects commit votes. A quorum of committed seals forms the commit
    /// QC, which the leader broadcasts in a `DECIDE`.
    pub(crate) async fn on_commit_vote(
        &mut self,
        sender: validator::Address,
        msg: &validator::Message,
        vote: validator::Vote,
    ) -> Result<(), Error> {
        // ----------- Checking origin of the message --------------

        self.check_to_proposer()?;

        // ----------- Checking the message --------------

        let rs = self.rs()?;
        let view = rs.view();
        let want = rs.locked_node().filter(|_| rs.state() >= State::PreCommitted);
        if want != Some(vote.digest) {
            return Err(Error::InvalidDigest {
                want,
                got: vote.digest,
            });
        }
        let Some(node) = rs.node.clone() else {
            return Err(Error::Internal(anyhow::anyhow!("locked without a node")));
        };
        let seal = msg
            .committed_seal
            .clone()
            .ok_or_else(|| Error::InvalidCommittedSeal(anyhow::anyhow!("missing")))?;
        let signer = seal
            .recover(&validator::wrap_committed_hash(&node.block.hash()))
            .map_err(Error::InvalidCommittedSeal)?;
        if signer != sender {
            return Err(Error::InvalidCommittedSeal(anyhow::anyhow!(
                "sealed by {signer}, sent by {sender}"
            )));
        }

        // ----------- All checks finished. Now we process the message. --------------

        let quorum = self.validators.quorum_size();
        let rs = self.rs_mut()?;
        if !rs.commit_votes.add(sender, seal) {
            return Ok(());
        }
        if rs.commit_votes.len() < quorum || rs.state() >= State::Committed {
            return Ok(());
        }
        let seals: Vec<_> = rs.commit_votes.values().cloned().collect();
        rs.set_state(State::Committed);
        let commit_qc = self
            .signer
            .seal_qc(view, validator::MsgCode::CommitVote, vote.digest, seals)
            .map_err(Error::Internal)?;
        tracing::info!(
            "HotStuff replica - commit QC for block {} formed in view {view}",
            node.block.number
        );
        self.send(
            Target::Broadcast,
            validator::ConsensusMsg::Decide(validator::Decide { commit_qc }),
            None,
        )
    }
}
