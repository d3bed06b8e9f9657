//! View changes: new heights, round changes and the round timer.
use hotstuff_consensus_roles::validator;

use super::{Core, Error, Target};
use crate::{
    metrics::METRICS,
    request_set::Request,
    round_state::{RoundState, State},
};

impl Core {
    /// Moves the replica to a new view.
    ///
    /// If the backend reports a chain head at or above the current height the
    /// replica moves to the first round of the next height. Otherwise `round`
    /// must be a later round of the current height. Then a `NEW_VIEW` is sent
    /// to the proposer of the new view and the backlog is replayed.
    pub(crate) async fn start_new_round(&mut self, round: validator::Round) -> Result<(), Error> {
        let Some((last, last_proposer)) = self.backend.last_proposal() else {
            tracing::debug!("HotStuff replica - chain head not available yet");
            return Ok(());
        };
        let current = self.current.as_ref().map(RoundState::view);

        let new_height = current.map_or(true, |v| last.number >= v.height);
        let view = if new_height {
            validator::View::new(last.number + 1, 0)
        } else {
            let Some(current) = current else {
                return Ok(());
            };
            if round == 0 {
                // Nothing new was committed.
                return Ok(());
            }
            if last.number + 1 != current.height || round < current.round {
                tracing::warn!(
                    "HotStuff replica - refusing to move from {current} to round {round} \
                     with chain head {}",
                    last.number
                );
                return Ok(());
            }
            validator::View::new(current.height, round)
        };

        if new_height {
            let anchor = match &self.head_qc {
                Some(qc) if qc.view.height == last.number => qc.clone(),
                _ => validator::QuorumCert::root(&last),
            };
            let mut pending = self.requests.take(view.height);
            if let Some(req) = &pending {
                if req.block.parent != last.hash() {
                    tracing::debug!(
                        "HotStuff replica - dropping request not extending the chain head"
                    );
                    pending = None;
                }
            }
            if let Some(prev) = current {
                METRICS.commit_latency.observe(self.height_started.elapsed());
                tracing::info!(
                    "HotStuff replica - height {} finalized, leaving view {prev}",
                    last.number
                );
            }
            self.current = Some(RoundState::new_height(view, anchor, pending));
            self.height_started = std::time::Instant::now();
        } else {
            METRICS.round_changes.inc();
            let prev = self
                .current
                .take()
                .ok_or_else(|| Error::Internal(anyhow::anyhow!("no round state")))?;
            tracing::info!("HotStuff replica - round change {} -> {view}", prev.view());
            let mut rs = RoundState::round_change(view, prev);
            if rs.pending_request.is_none() {
                rs.pending_request = self.requests.take(view.height);
            }
            self.current = Some(rs);
        }

        self.validators = self.backend.validators(true);
        self.validators.calc_proposer(&last_proposer, view.round);
        self.last = Some((last, last_proposer));
        METRICS.view_height.set(view.height);
        METRICS.view_round.set(view.round);

        let prepare_qc = self.rs()?.prepare_qc.clone();
        tracing::debug!(
            "HotStuff replica - entering view {view}, proposer {}",
            self.validators.proposer()
        );
        self.send(
            Target::Unicast,
            validator::ConsensusMsg::NewView(validator::NewView { prepare_qc }),
            None,
        )?;
        self.reset_timer(view);
        self.process_backlog()
    }

    /// Handles the expiry of the round timer of `view`.
    pub(crate) async fn handle_timeout(&mut self, view: validator::View) -> Result<(), Error> {
        let Some(current) = self.current.as_ref().map(RoundState::view) else {
            return Ok(());
        };
        if view != current {
            // Timer of a view the replica already left.
            return Ok(());
        }
        tracing::warn!("HotStuff replica - view {view} timed out");
        self.start_new_round(view.round + 1).await
    }

    /// Records a block the local node wants decided.
    pub(crate) async fn handle_request(&mut self, req: Request) -> Result<(), Error> {
        let Some(rs) = self.current.as_mut() else {
            self.requests.store(req);
            return Ok(());
        };
        let height = rs.view().height;
        if req.height() > height {
            self.requests.store(req);
            return Ok(());
        }
        if req.height() < height {
            tracing::debug!(
                "HotStuff replica - dropping stale request for height {}",
                req.height()
            );
            return Ok(());
        }
        rs.pending_request = Some(req);
        // A leader which already holds a high QC was only waiting for a block.
        let waiting = rs.state() == State::HighQc && !rs.proposed;
        if waiting && self.is_proposer() {
            return self.send_prepare().await;
        }
        Ok(())
    }

    /// Replays the backlogged messages that are due in the current view.
    pub(crate) fn process_backlog(&mut self) -> Result<(), Error> {
        let view = self.rs()?.view();
        let local = self.local.backlog.clone();
        self.backlog.process(view, |sender, msg| {
            let _ = local.send((sender, msg));
        });
        Ok(())
    }

    fn reset_timer(&mut self, view: validator::View) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        let timeout = self.config.round_timeout(view.round);
        let timeouts = self.local.timeouts.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = timeouts.send(view);
        }));
    }
}
