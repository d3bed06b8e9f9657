//! The HotStuff replica: a single-threaded state machine driven by an event loop.
//!
//! Every validator runs the same replica. In each view one of them is the
//! proposer (leader): it collects `NEW_VIEW` messages, proposes a node and
//! aggregates the votes of the three voting phases into quorum certificates.
//! The other validators only vote. A node is final once the leader
//! broadcasts its commit QC in a `DECIDE` message.
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context as _;
use hotstuff_consensus_roles::validator;
use tokio::{sync::mpsc, task::JoinHandle};

pub(crate) use self::error::Error;
use crate::{
    backend::Backend,
    backlog::Backlog,
    metrics::{self, METRICS},
    request_set::{Request, RequestSet},
    round_state::RoundState,
    Config, EventReceiver,
};

mod check;
mod commit;
mod decide;
mod error;
mod new_view;
mod pre_commit;
mod prepare;
mod round;
#[cfg(test)]
pub(crate) mod testonly;
#[cfg(test)]
mod tests;

/// How an outbound message is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    /// To every validator, including the sender.
    Broadcast,
    /// To the proposer of the view.
    Unicast,
    /// To every validator except the sender.
    Gossip,
}

/// A message to be sent by the dispatcher.
#[derive(Debug)]
pub(crate) struct Outbound {
    pub(crate) target: Target,
    pub(crate) validators: validator::ValidatorSet,
    pub(crate) msg: validator::Message,
}

/// Events the replica posts to itself.
#[derive(Debug)]
pub(crate) struct LocalEvents {
    pub(crate) backlog: mpsc::UnboundedReceiver<(validator::Address, validator::Message)>,
    pub(crate) timeouts: mpsc::UnboundedReceiver<validator::View>,
}

#[derive(Debug, Clone)]
pub(crate) struct LocalSenders {
    backlog: mpsc::UnboundedSender<(validator::Address, validator::Message)>,
    timeouts: mpsc::UnboundedSender<validator::View>,
}

/// The replica. All of its state is owned by the event loop.
#[derive(Debug)]
pub(crate) struct Core {
    pub(crate) config: Arc<Config>,
    pub(crate) signer: validator::Signer,
    pub(crate) backend: Arc<dyn Backend>,
    outbound: mpsc::UnboundedSender<Outbound>,
    local: LocalSenders,
    pub(crate) backlog: Backlog,
    pub(crate) requests: RequestSet,
    /// Validator set of the current height, with the proposer of the current round.
    pub(crate) validators: validator::ValidatorSet,
    /// `None` until the backend provides a chain head.
    pub(crate) current: Option<RoundState>,
    /// Chain head and its proposer, as of the start of the current view.
    pub(crate) last: Option<(validator::Block, validator::Address)>,
    /// Commit QC of the chain head, if the local node decided it.
    pub(crate) head_qc: Option<validator::QuorumCert>,
    timer: Option<JoinHandle<()>>,
    height_started: Instant,
}

/// An input of the event loop.
#[derive(Debug)]
enum Event {
    Request(Request),
    Message(Vec<u8>),
    Backlog(validator::Address, validator::Message),
    Timeout(validator::View),
    FinalCommitted,
}

impl Core {
    pub(crate) fn new(
        config: Arc<Config>,
        backend: Arc<dyn Backend>,
        outbound: mpsc::UnboundedSender<Outbound>,
    ) -> (Self, LocalEvents) {
        let signer = validator::Signer::new(config.secret_key.clone());
        let (backlog_send, backlog_recv) = mpsc::unbounded_channel();
        let (timeouts_send, timeouts_recv) = mpsc::unbounded_channel();
        let core = Self {
            backlog: Backlog::new(signer.address(), config.max_backlog_per_sender),
            requests: RequestSet::default(),
            validators: backend.validators(true),
            current: None,
            last: None,
            head_qc: None,
            timer: None,
            height_started: Instant::now(),
            local: LocalSenders {
                backlog: backlog_send,
                timeouts: timeouts_send,
            },
            config,
            signer,
            backend,
            outbound,
        };
        let local = LocalEvents {
            backlog: backlog_recv,
            timeouts: timeouts_recv,
        };
        (core, local)
    }

    /// Runs the replica until the inbound message channel is closed.
    pub(crate) async fn run(
        mut self,
        mut inbound: EventReceiver,
        mut local: LocalEvents,
    ) -> anyhow::Result<()> {
        if self.backend.address() != self.signer.address() {
            anyhow::bail!("backend address doesn't match the secret key");
        }
        self.start_new_round(0).await.map_err(|err| match err {
            Error::Internal(err) => err,
            err => anyhow::anyhow!(err),
        })?;

        loop {
            let event = tokio::select! {
                biased;
                Some(view) = local.timeouts.recv() => Event::Timeout(view),
                Some((sender, msg)) = local.backlog.recv() => Event::Backlog(sender, msg),
                Some(()) = inbound.final_committed.recv() => Event::FinalCommitted,
                Some(block) = inbound.requests.recv() => Event::Request(Request { block }),
                payload = inbound.messages.recv() => match payload {
                    Some(payload) => Event::Message(payload),
                    None => break,
                },
            };
            self.handle_event(event).await?;
        }
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        Ok(())
    }

    /// Processes a single event. Returns an error only if the replica can't continue.
    async fn handle_event(&mut self, event: Event) -> anyhow::Result<()> {
        let res = match event {
            Event::Request(req) => self.handle_request(req).await,
            Event::Message(payload) => match hotstuff_protobuf::decode(&payload) {
                Ok(msg) => return self.on_message(None, msg).await,
                Err(err) => Err(Error::Decode(err)),
            },
            Event::Backlog(sender, msg) => return self.on_message(Some(sender), msg).await,
            Event::Timeout(view) => self.handle_timeout(view).await,
            Event::FinalCommitted => self.start_new_round(0).await,
        };
        match res {
            Ok(()) => Ok(()),
            Err(Error::Internal(err)) => {
                tracing::error!("HotStuff replica - internal error: {err:#}");
                Err(err)
            }
            Err(err) => {
                tracing::warn!("HotStuff replica - {err}");
                Ok(())
            }
        }
    }

    /// Processes a protocol message, logging and recording the outcome.
    async fn on_message(
        &mut self,
        sender: Option<validator::Address>,
        msg: validator::Message,
    ) -> anyhow::Result<()> {
        let now = Instant::now();
        let label = metrics::MsgLabel::from(msg.code);
        let res = match self.process_message(sender, msg).await {
            Ok(()) => Ok(()),
            Err(err) => {
                match err {
                    Error::Internal(err) => {
                        tracing::error!("HotStuff replica - internal error: {err:#}");
                        return Err(err);
                    }
                    err if err.is_view_skew() => {
                        tracing::debug!("HotStuff replica - {label:?} message ignored: {err}");
                    }
                    err => {
                        tracing::warn!("HotStuff replica - {label:?} message rejected: {err}");
                    }
                }
                Err(())
            }
        };
        METRICS.message_processing_latency[&label.with_result(&res)].observe(now.elapsed());
        Ok(())
    }

    /// Authenticates a message, classifies its view and routes it to its handler.
    /// Messages for a future view are moved to the backlog before their
    /// sender's membership is settled.
    pub(crate) async fn process_message(
        &mut self,
        sender: Option<validator::Address>,
        msg: validator::Message,
    ) -> Result<(), Error> {
        let sender = match sender {
            Some(sender) => sender,
            None => msg.recover_sender().map_err(Error::InvalidSignature)?,
        };
        if let Err(err) = self.check_view(msg.code, msg.view) {
            if let Error::FutureMessage { .. } = err {
                // Membership is checked again once the message is replayed.
                if !self.may_participate(&sender, msg.view) {
                    return Err(Error::NonValidatorSigner(sender));
                }
                tracing::trace!(
                    "HotStuff replica - backlogging {} {} from {sender}",
                    msg.code,
                    msg.view
                );
                self.backlog.store(sender, msg);
            }
            return Err(err);
        }
        if !self.validators.contains(&sender) {
            return Err(Error::NonValidatorSigner(sender));
        }
        let payload = msg.decode_payload().map_err(Error::Decode)?;

        use validator::ConsensusMsg as M;
        match payload {
            M::NewView(m) => self.on_new_view(sender, m).await,
            M::Prepare(m) => self.on_prepare(sender, &msg, m).await,
            M::PrepareVote(m) => self.on_prepare_vote(sender, &msg, m).await,
            M::PreCommit(m) => self.on_pre_commit(sender, m).await,
            M::PreCommitVote(m) => self.on_pre_commit_vote(sender, &msg, m).await,
            M::Commit(m) => self.on_commit(sender, m).await,
            M::CommitVote(m) => self.on_commit_vote(sender, &msg, m).await,
            M::Decide(m) => self.on_decide(sender, &msg, m).await,
        }
    }

    /// State of the current view.
    pub(crate) fn rs(&self) -> Result<&RoundState, Error> {
        self.current
            .as_ref()
            .context("no round state")
            .map_err(Error::Internal)
    }

    pub(crate) fn rs_mut(&mut self) -> Result<&mut RoundState, Error> {
        self.current
            .as_mut()
            .context("no round state")
            .map_err(Error::Internal)
    }

    /// Chain head as of the start of the current view.
    pub(crate) fn last_block(&self) -> Result<&validator::Block, Error> {
        self.last
            .as_ref()
            .map(|(block, _)| block)
            .context("no chain head")
            .map_err(Error::Internal)
    }

    /// Whether the local node is the proposer of the current view.
    pub(crate) fn is_proposer(&self) -> bool {
        self.validators.is_proposer(&self.signer.address())
    }

    /// Fails unless `sender` is the proposer of the current view.
    pub(crate) fn check_from_proposer(&self, sender: validator::Address) -> Result<(), Error> {
        let proposer = self.validators.proposer();
        if sender != proposer {
            return Err(Error::NotFromProposer { proposer, sender });
        }
        Ok(())
    }

    /// Fails unless the local node is the proposer of the current view.
    pub(crate) fn check_to_proposer(&self) -> Result<(), Error> {
        if !self.is_proposer() {
            return Err(Error::NotToProposer);
        }
        Ok(())
    }

    /// Signs a message for the current view and hands it to the dispatcher.
    pub(crate) fn send(
        &self,
        target: Target,
        msg: validator::ConsensusMsg,
        committed_seal: Option<validator::Signature>,
    ) -> Result<(), Error> {
        let view = self.rs()?.view();
        let msg = self
            .signer
            .sign_msg(view, &msg, committed_seal)
            .map_err(Error::Internal)?;
        self.forward(target, msg)
    }

    /// Passes on a message signed by someone else.
    pub(crate) fn forward(&self, target: Target, msg: validator::Message) -> Result<(), Error> {
        self.outbound
            .send(Outbound {
                target,
                validators: self.validators.clone(),
                msg,
            })
            .ok()
            .context("outbound channel closed")
            .map_err(Error::Internal)
    }

    /// Posts a message back to the event loop after `delay`.
    pub(crate) fn retry_later(
        &self,
        delay: Duration,
        sender: validator::Address,
        msg: validator::Message,
    ) {
        let backlog = self.local.backlog.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = backlog.send((sender, msg));
        });
    }
}

/// Hands outbound messages to the backend until the channel is closed.
///
/// Every message is sent by its own task, so a send that doesn't complete
/// holds up neither the event loop nor the messages produced after it.
pub(crate) async fn dispatch(
    backend: Arc<dyn Backend>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(out) = outbound.recv().await {
        tokio::spawn(send(backend.clone(), out));
    }
}

async fn send(backend: Arc<dyn Backend>, out: Outbound) {
    let payload = hotstuff_protobuf::encode(&out.msg);
    let res = match out.target {
        Target::Broadcast => backend.broadcast(&out.validators, payload).await,
        Target::Unicast => backend.unicast(&out.validators, payload).await,
        Target::Gossip => backend.gossip(&out.validators, payload).await,
    };
    if let Err(err) = res {
        tracing::warn!(
            "HotStuff replica - failed to send {} {}: {err:#}",
            out.msg.code,
            out.msg.view
        );
    }
}
