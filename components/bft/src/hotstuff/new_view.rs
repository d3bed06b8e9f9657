//! `NEW_VIEW` handling and the proposal of the leader.
use anyhow::Context as _;
use hotstuff_consensus_roles::validator;

use super::{Core, Error, Target};
use crate::round_state::State;

impl Core {
    /// Collects `NEW_VIEW` messages. Once a quorum is reached the highest
    /// prepare QC among them becomes the high QC and the leader proposes.
    pub(crate) async fn on_new_view(
        &mut self,
        sender: validator::Address,
        msg: validator::NewView,
    ) -> Result<(), Error> {
        // ----------- Checking origin of the message --------------

        self.check_to_proposer()?;

        // ----------- Checking the message --------------

        let view = self.rs()?.view();
        let qc = msg.prepare_qc;
        if qc.view >= view {
            return Err(Error::InvalidQc(anyhow::anyhow!(
                "prepare QC of view {} in a NEW_VIEW of view {view}",
                qc.view
            )));
        }
        self.check_qc(&qc)?;

        // ----------- All checks finished. Now we process the message. --------------

        let quorum = self.validators.quorum_size();
        let rs = self.rs_mut()?;
        if !rs.new_views.add(sender, qc) {
            return Ok(());
        }
        if rs.new_views.len() < quorum || rs.state() >= State::HighQc {
            return Ok(());
        }
        let high_qc = rs
            .new_views
            .values()
            .max_by_key(|qc| qc.rank())
            .cloned()
            .context("empty NEW_VIEW set")
            .map_err(Error::Internal)?;
        tracing::debug!(
            "HotStuff replica - high QC of view {view} is {} of view {}",
            high_qc.code,
            high_qc.view
        );
        rs.high_qc = Some(high_qc);
        rs.set_state(State::HighQc);
        self.send_prepare().await
    }

    /// Broadcasts the proposal of the leader: the node certified by the high
    /// QC if it belongs to the current height, a new node carrying the
    /// pending request otherwise.
    pub(crate) async fn send_prepare(&mut self) -> Result<(), Error> {
        let last_hash = self.last_block()?.hash();
        let rs = self.rs_mut()?;
        let height = rs.view().height;
        if rs.proposed {
            return Ok(());
        }
        let Some(high_qc) = rs.high_qc.clone() else {
            return Ok(());
        };
        let node = if high_qc.view.height == height {
            match rs.node.as_ref().filter(|node| node.hash() == high_qc.node) {
                Some(node) => node.clone(),
                None => {
                    tracing::warn!(
                        "HotStuff replica - high QC certifies node {:?} which is not known locally",
                        high_qc.node
                    );
                    return Ok(());
                }
            }
        } else {
            let Some(req) = rs.pending_request.clone() else {
                tracing::debug!(
                    "HotStuff replica - waiting for a block to propose at height {height}"
                );
                return Ok(());
            };
            if req.block.number != height || req.block.parent != last_hash {
                tracing::warn!(
                    "HotStuff replica - dropping request for block {} not extending the chain head",
                    req.block.number
                );
                return Ok(());
            }
            validator::Node {
                parent: high_qc.node,
                block: req.block,
            }
        };
        tracing::info!(
            "HotStuff replica - proposing block {} in view {}",
            node.block.number,
            rs.view()
        );
        rs.set_node(node.clone());
        rs.proposed = true;
        self.send(
            Target::Broadcast,
            validator::ConsensusMsg::Prepare(validator::Proposal { node, qc: high_qc }),
            None,
        )
    }
}
