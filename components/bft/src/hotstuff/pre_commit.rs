//! `PRE_COMMIT` and `PRE_COMMIT_VOTE` handling.
use hotstuff_consensus_roles::validator;

use super::{Core, Error, Target};
use crate::round_state::State;

impl Core {
    /// Locks on the node certified by the prepare QC of the leader and votes.
    pub(crate) async fn on_pre_commit(
        &mut self,
        sender: validator::Address,
        proposal: validator::Proposal,
    ) -> Result<(), Error> {
        // ----------- Checking origin of the message --------------

        self.check_from_proposer(sender)?;
        let digest = proposal.node.hash();
        if self.is_proposer() {
            // The leader locks once a quorum of replicas did.
            return self.send_vote(validator::MsgCode::PreCommitVote, digest);
        }

        // ----------- Checking the message --------------

        let rs = self.rs()?;
        let view = rs.view();
        let want = rs.node_hash();
        if want != Some(digest) {
            return Err(Error::InvalidDigest { want, got: digest });
        }
        let qc = proposal.qc;
        if qc.code != validator::MsgCode::PrepareVote || qc.view != view || qc.node != digest {
            return Err(Error::InvalidQc(anyhow::anyhow!(
                "expected a prepare QC of view {view} for the proposed node"
            )));
        }
        self.check_qc(&qc)?;

        // ----------- All checks finished. Now we process the message. --------------

        let rs = self.rs_mut()?;
        if rs.state() < State::PreCommitted {
            rs.lock(qc);
            rs.set_state(State::PreCommitted);
            tracing::debug!("HotStuff replica - locked on {digest:?} in view {view}");
        }
        self.send_vote(validator::MsgCode::PreCommitVote, digest)?;
        self.replay_early_decide()
    }

    /// Collects pre-commit votes. With a quorum the leader locks and
    /// broadcasts its locked QC in a `COMMIT`.
    pub(crate) async fn on_pre_commit_vote(
        &mut self,
        sender: validator::Address,
        msg: &validator::Message,
        vote: validator::Vote,
    ) -> Result<(), Error> {
        // ----------- Checking origin of the message --------------

        self.check_to_proposer()?;

        // ----------- Checking the message --------------

        let rs = self.rs()?;
        let want = (rs.state() >= State::Prepared).then_some(rs.prepare_qc.node);
        if want != Some(vote.digest) {
            return Err(Error::InvalidDigest {
                want,
                got: vote.digest,
            });
        }

        // ----------- All checks finished. Now we process the message. --------------

        let quorum = self.validators.quorum_size();
        let rs = self.rs_mut()?;
        if !rs.pre_commit_votes.add(sender, msg.signature.clone()) {
            return Ok(());
        }
        if rs.pre_commit_votes.len() < quorum || rs.state() >= State::PreCommitted {
            return Ok(());
        }
        let locked_qc = rs.prepare_qc.clone();
        rs.lock(locked_qc.clone());
        rs.set_state(State::PreCommitted);
        tracing::debug!("HotStuff replica - leader locked in view {}", rs.view());
        self.send(
            Target::Broadcast,
            validator::ConsensusMsg::Commit(validator::Commit { locked_qc }),
            None,
        )
    }
}
