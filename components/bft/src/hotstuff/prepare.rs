//! `PREPARE` and `PREPARE_VOTE` handling.
use hotstuff_consensus_roles::validator;

use super::{Core, Error, Target};
use crate::{backend::VerifyError, round_state::State};

impl Core {
    /// Validates the proposal of the leader and votes for it.
    pub(crate) async fn on_prepare(
        &mut self,
        sender: validator::Address,
        msg: &validator::Message,
        proposal: validator::Proposal,
    ) -> Result<(), Error> {
        // ----------- Checking origin of the message --------------

        self.check_from_proposer(sender)?;
        let node = proposal.node;
        let digest = node.hash();
        if self.is_proposer() {
            // Our own proposal, already validated when it was built.
            return self.send_vote(validator::MsgCode::PrepareVote, digest);
        }

        // ----------- Checking the message --------------

        let rs = self.rs()?;
        let view = rs.view();
        if rs.state() >= State::HighQc {
            if rs.node_hash() == Some(digest) {
                // Duplicate delivery, the vote was already sent.
                return Ok(());
            }
            return Err(Error::InvalidProposal(anyhow::anyhow!(
                "a different proposal was already accepted in view {view}"
            )));
        }
        let last = self.last_block()?;
        if node.block.number != view.height {
            return Err(Error::InvalidProposal(anyhow::anyhow!(
                "block number {} in view {view}",
                node.block.number
            )));
        }
        if node.block.parent != last.hash() {
            return Err(Error::InvalidProposal(anyhow::anyhow!(
                "block doesn't extend the chain head"
            )));
        }
        let high_qc = proposal.qc;
        if high_qc.view >= view {
            return Err(Error::InvalidQc(anyhow::anyhow!(
                "high QC of view {} in view {view}",
                high_qc.view
            )));
        }
        self.check_qc(&high_qc)?;
        self.extends(&node, &high_qc)?;
        self.safe_node(&node, &high_qc)?;

        match self.backend.verify(&node.block, false).await {
            Ok(()) => {}
            Err(VerifyError::FutureBlock(delay)) => {
                self.retry_later(delay, sender, msg.clone());
                return Err(Error::FutureBlock(delay));
            }
            Err(VerifyError::Invalid(err)) => return Err(Error::InvalidProposal(err)),
        }

        // ----------- All checks finished. Now we process the message. --------------

        let rs = self.rs_mut()?;
        rs.set_node(node);
        rs.high_qc = Some(high_qc);
        rs.set_state(State::HighQc);
        self.send_vote(validator::MsgCode::PrepareVote, digest)
    }

    /// Collects prepare votes. A quorum forms the prepare QC, which the
    /// leader broadcasts in a `PRE_COMMIT`.
    pub(crate) async fn on_prepare_vote(
        &mut self,
        sender: validator::Address,
        msg: &validator::Message,
        vote: validator::Vote,
    ) -> Result<(), Error> {
        // ----------- Checking origin of the message --------------

        self.check_to_proposer()?;

        // ----------- Checking the message --------------

        let rs = self.rs()?;
        let want = rs.node_hash().filter(|_| rs.proposed);
        if want != Some(vote.digest) {
            return Err(Error::InvalidDigest {
                want,
                got: vote.digest,
            });
        }

        // ----------- All checks finished. Now we process the message. --------------

        let quorum = self.validators.quorum_size();
        let rs = self.rs_mut()?;
        if !rs.prepare_votes.add(sender, msg.signature.clone()) {
            return Ok(());
        }
        if rs.prepare_votes.len() < quorum || rs.state() >= State::Prepared {
            return Ok(());
        }
        let view = rs.view();
        let votes = rs.prepare_votes.values().cloned().collect();
        let qc = self
            .signer
            .seal_qc(view, validator::MsgCode::PrepareVote, vote.digest, votes)
            .map_err(Error::Internal)?;
        let rs = self.rs_mut()?;
        let Some(node) = rs.node.clone() else {
            return Err(Error::Internal(anyhow::anyhow!("prepare QC without a node")));
        };
        rs.prepare_qc = qc.clone();
        rs.set_state(State::Prepared);
        tracing::debug!("HotStuff replica - prepare QC formed in view {view}");
        self.send(
            Target::Broadcast,
            validator::ConsensusMsg::PreCommit(validator::Proposal { node, qc }),
            None,
        )
    }

    /// Sends a vote for `digest` to the proposer of the current view.
    pub(crate) fn send_vote(
        &self,
        code: validator::MsgCode,
        digest: validator::NodeHash,
    ) -> Result<(), Error> {
        let vote = validator::Vote { digest };
        let (msg, seal) = match code {
            validator::MsgCode::PrepareVote => (validator::ConsensusMsg::PrepareVote(vote), None),
            validator::MsgCode::PreCommitVote => {
                (validator::ConsensusMsg::PreCommitVote(vote), None)
            }
            validator::MsgCode::CommitVote => {
                let block = self
                    .rs()?
                    .node
                    .as_ref()
                    .filter(|node| node.hash() == digest)
                    .map(|node| node.block.hash())
                    .ok_or_else(|| {
                        Error::Internal(anyhow::anyhow!("commit vote for an unknown node"))
                    })?;
                let seal = self
                    .signer
                    .seal_committed(&block)
                    .map_err(Error::Internal)?;
                (validator::ConsensusMsg::CommitVote(vote), Some(seal))
            }
            code => {
                return Err(Error::Internal(anyhow::anyhow!("{code} is not a vote")));
            }
        };
        self.send(Target::Unicast, msg, seal)
    }
}
