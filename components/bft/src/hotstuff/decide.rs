//! `DECIDE` handling: the block becomes final.
use hotstuff_consensus_roles::validator;

use super::{Core, Error, Target};
use crate::{backend::VerifyError, metrics::METRICS, round_state::State};

impl Core {
    /// Commits the locked node once its commit QC is known, then moves to
    /// the next height.
    pub(crate) async fn on_decide(
        &mut self,
        sender: validator::Address,
        msg: &validator::Message,
        decide: validator::Decide,
    ) -> Result<(), Error> {
        // ----------- Checking origin of the message --------------

        // The decision may come from the leader of an earlier round.
        let last_proposer = self
            .last
            .as_ref()
            .map(|(_, proposer)| *proposer)
            .ok_or_else(|| Error::Internal(anyhow::anyhow!("no chain head")))?;
        let proposer = self.validators.proposer_for(&last_proposer, msg.view.round);
        if sender != proposer {
            return Err(Error::NotFromProposer { proposer, sender });
        }

        // ----------- Checking the message --------------

        let qc = decide.commit_qc;
        if qc.code != validator::MsgCode::CommitVote || qc.view != msg.view {
            return Err(Error::InvalidQc(anyhow::anyhow!(
                "expected a commit QC of view {}",
                msg.view
            )));
        }
        let rs = self.rs()?;
        let want = rs.locked_node();
        if want.is_none() {
            // PRE_COMMIT or COMMIT is still in transit. The decision is
            // applied once the replica locks.
            tracing::debug!(
                "HotStuff replica - DECIDE of {} arrived before the lock, buffering",
                msg.view
            );
            self.rs_mut()?.early_decide = Some((sender, msg.clone()));
            return Ok(());
        }
        if want != Some(qc.node) {
            return Err(Error::InvalidDigest { want, got: qc.node });
        }
        let Some(node) = rs.node.clone().filter(|node| node.hash() == qc.node) else {
            return Err(Error::Internal(anyhow::anyhow!("locked on an unknown node")));
        };
        self.check_qc(&qc)?;

        let sealed = self
            .backend
            .pre_commit(&node.block, qc.committed_seals.clone())
            .await
            .map_err(Error::Backend)?;
        match self.backend.verify(&sealed, true).await {
            Ok(()) => {}
            Err(VerifyError::FutureBlock(delay)) => {
                self.retry_later(delay, sender, msg.clone());
                return Err(Error::FutureBlock(delay));
            }
            Err(VerifyError::Invalid(err)) => return Err(Error::InvalidProposal(err)),
        }

        // ----------- All checks finished. Now we process the message. --------------

        let rs = self.rs_mut()?;
        rs.committed_qc = qc.clone();
        rs.set_state(State::Committed);
        let number = sealed.number;
        self.backend.commit(sealed).await.map_err(Error::Backend)?;
        tracing::info!("HotStuff replica - committed block {number} in view {}", msg.view);
        METRICS.finalized_height.set(number);
        self.head_qc = Some(qc);
        if sender != self.signer.address() {
            // Peers which missed the leader's broadcast can still decide.
            self.forward(Target::Gossip, msg.clone())?;
        }
        self.start_new_round(0).await
    }

    /// Replays a `DECIDE` buffered before the replica locked.
    pub(crate) fn replay_early_decide(&mut self) -> Result<(), Error> {
        if let Some((sender, msg)) = self.rs_mut()?.early_decide.take() {
            let _ = self.local.backlog.send((sender, msg));
        }
        Ok(())
    }
}
