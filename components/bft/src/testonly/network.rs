use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard},
};

use hotstuff_consensus_roles::validator;

use crate::EventSender;

/// Enum representing the behavior of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behavior {
    /// A validator that is always online and behaves honestly.
    Honest,
    /// A validator that is offline: it neither sends nor receives messages.
    Offline,
}

#[derive(Debug, Default)]
struct Nodes {
    events: HashMap<validator::Address, EventSender>,
    offline: HashSet<validator::Address>,
}

/// In-memory network connecting the engines of a test.
#[derive(Debug, Default)]
pub struct Network {
    nodes: Mutex<Nodes>,
}

impl Network {
    fn nodes(&self) -> MutexGuard<'_, Nodes> {
        self.nodes.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Connects the engine of validator `addr`.
    pub fn connect(&self, addr: validator::Address, events: EventSender, behavior: Behavior) {
        let mut nodes = self.nodes();
        nodes.events.insert(addr, events);
        if behavior == Behavior::Offline {
            nodes.offline.insert(addr);
        }
    }

    /// Disconnects every engine, which makes them stop.
    pub fn shutdown(&self) {
        self.nodes().events.clear();
    }

    /// Delivers a message. Messages from or to an offline node are lost.
    pub fn deliver(&self, from: &validator::Address, to: &validator::Address, payload: Vec<u8>) {
        let nodes = self.nodes();
        if nodes.offline.contains(from) || nodes.offline.contains(to) {
            return;
        }
        if let Some(events) = nodes.events.get(to) {
            events.message(payload);
        }
    }

    /// Passes a block request to the engine of `addr`.
    pub fn request(&self, addr: &validator::Address, block: validator::Block) {
        if let Some(events) = self.nodes().events.get(addr) {
            events.request(block);
        }
    }
}
