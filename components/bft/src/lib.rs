//! This crate contains the consensus core, which is responsible for reaching agreement on blocks
//! among a fixed set of validators. It implements a variant of HotStuff with three voting phases
//! (prepare, pre-commit, commit) in which the leader of each view aggregates the votes into
//! quorum certificates.
//!
//! The core is a single event loop. It is fed through an [`EventSender`] and talks to the hosting
//! node through the [`Backend`] trait.

use std::sync::Arc;

pub use backend::{Backend, CheckpointStatus, VerifyError};
pub use config::Config;
use hotstuff_consensus_roles::validator;
pub use request_set::Request;
use tokio::sync::mpsc;

mod backend;
mod backlog;
mod config;
/// This module contains the implementation of the HotStuff replica.
mod hotstuff;
mod message_set;
mod metrics;
mod request_set;
mod round_state;
pub mod testonly;

impl Config {
    /// Starts the consensus core. It runs until every [`EventSender`] of `events` is dropped,
    /// or until the replica hits an internal error.
    pub async fn run(self, backend: Arc<dyn Backend>, events: EventReceiver) -> anyhow::Result<()> {
        tracing::info!(
            "Starting consensus core of validator {}",
            self.secret_key.address()
        );
        let (outbound_send, outbound_recv) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(hotstuff::dispatch(backend.clone(), outbound_recv));
        let (core, local) = hotstuff::Core::new(Arc::new(self), backend, outbound_send);
        let res = core.run(events, local).await;
        dispatcher.abort();
        res
    }
}

/// Handle used to feed the consensus core.
#[derive(Debug, Clone)]
pub struct EventSender {
    requests: mpsc::UnboundedSender<validator::Block>,
    messages: mpsc::UnboundedSender<Vec<u8>>,
    final_committed: mpsc::UnboundedSender<()>,
}

/// Receiving end of an [`EventSender`], consumed by [`Config::run`].
#[derive(Debug)]
pub struct EventReceiver {
    requests: mpsc::UnboundedReceiver<validator::Block>,
    messages: mpsc::UnboundedReceiver<Vec<u8>>,
    final_committed: mpsc::UnboundedReceiver<()>,
}

/// Creates a new input channel of the consensus core.
pub fn create_event_channel() -> (EventSender, EventReceiver) {
    let (requests_send, requests_recv) = mpsc::unbounded_channel();
    let (messages_send, messages_recv) = mpsc::unbounded_channel();
    let (final_send, final_recv) = mpsc::unbounded_channel();
    (
        EventSender {
            requests: requests_send,
            messages: messages_send,
            final_committed: final_send,
        },
        EventReceiver {
            requests: requests_recv,
            messages: messages_recv,
            final_committed: final_recv,
        },
    )
}

// Sends fail only once the engine has stopped, at which point the events are moot.
impl EventSender {
    /// Asks the core to get `block` decided. Only the leader proposes it.
    pub fn request(&self, block: validator::Block) {
        let _ = self.requests.send(block);
    }

    /// Delivers an encoded protocol message received from the network.
    pub fn message(&self, payload: Vec<u8>) {
        let _ = self.messages.send(payload);
    }

    /// Notifies the core that the chain head was advanced outside of consensus.
    pub fn final_committed(&self) {
        let _ = self.final_committed.send(());
    }
}
