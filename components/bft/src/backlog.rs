//! Buffer of messages that arrived ahead of the local view.
use std::{
    cmp::{Ordering, Reverse},
    collections::{BinaryHeap, HashMap},
    sync::RwLock,
};

use hotstuff_consensus_roles::validator;

use crate::metrics::METRICS;

#[derive(Debug)]
struct Entry {
    seq: u64,
    msg: validator::Message,
}

impl Entry {
    fn key(&self) -> (validator::View, validator::MsgCode, u64) {
        (self.msg.view, self.msg.code, self.seq)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

#[derive(Debug, Default)]
struct Queues {
    by_sender: HashMap<validator::Address, BinaryHeap<Reverse<Entry>>>,
    next_seq: u64,
    len: usize,
}

/// Per-sender priority queues of future messages.
///
/// Messages are replayed in (view, code, arrival) order once the local view
/// catches up with them.
#[derive(Debug)]
pub(crate) struct Backlog {
    own: validator::Address,
    max_per_sender: usize,
    queues: RwLock<Queues>,
}

impl Backlog {
    pub(crate) fn new(own: validator::Address, max_per_sender: usize) -> Self {
        Self {
            own,
            max_per_sender,
            queues: RwLock::default(),
        }
    }

    /// Buffers a message of `sender`. Messages of the local node are never
    /// buffered. Returns whether the message was stored.
    pub(crate) fn store(&self, sender: validator::Address, msg: validator::Message) -> bool {
        if sender == self.own {
            return false;
        }
        let mut queues = self.queues.write().unwrap_or_else(|p| p.into_inner());
        let seq = queues.next_seq;
        let queue = queues.by_sender.entry(sender).or_default();
        if queue.len() >= self.max_per_sender {
            tracing::debug!("HotStuff replica - backlog of {sender} is full, dropping message");
            return false;
        }
        queue.push(Reverse(Entry { seq, msg }));
        queues.next_seq += 1;
        queues.len += 1;
        METRICS.backlog_size.set(queues.len as u64);
        true
    }

    /// Removes the messages that are due at `current` and hands them to `replay`
    /// in order. Messages for views lower than `current` are discarded, except
    /// `DECIDE` messages from an earlier round of the same height.
    pub(crate) fn process(
        &self,
        current: validator::View,
        mut replay: impl FnMut(validator::Address, validator::Message),
    ) {
        let mut queues = self.queues.write().unwrap_or_else(|p| p.into_inner());
        let mut removed = 0;
        for (sender, queue) in &mut queues.by_sender {
            while let Some(Reverse(entry)) = queue.peek() {
                let view = entry.msg.view;
                let due = view == current
                    || (view.height == current.height
                        && view.round < current.round
                        && entry.msg.code == validator::MsgCode::Decide);
                if !due && view > current {
                    break;
                }
                let Some(Reverse(entry)) = queue.pop() else {
                    break;
                };
                removed += 1;
                if due {
                    replay(*sender, entry.msg);
                }
            }
        }
        queues.by_sender.retain(|_, q| !q.is_empty());
        queues.len -= removed;
        METRICS.backlog_size.set(queues.len as u64);
    }

    /// Number of buffered messages.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.queues.read().unwrap_or_else(|p| p.into_inner()).len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng as _;
    use validator::{testonly::Setup, MsgCode, View};

    fn msg(setup: &Setup, i: usize, view: View, code: MsgCode) -> validator::Message {
        msg_with_digest(setup, i, view, code, validator::NodeHash::ZERO)
    }

    fn msg_with_digest(
        setup: &Setup,
        i: usize,
        view: View,
        code: MsgCode,
        digest: validator::NodeHash,
    ) -> validator::Message {
        let payload = match code {
            MsgCode::PrepareVote | MsgCode::PreCommitVote | MsgCode::CommitVote => {
                validator::testonly::vote_msg(code, digest)
            }
            _ => validator::testonly::vote_msg(MsgCode::PrepareVote, digest),
        };
        let mut msg = setup.signer(i).sign_msg(view, &payload, None).unwrap();
        // Only the ordering metadata matters here.
        msg.code = code;
        msg
    }

    #[test]
    fn replays_in_view_then_code_order() {
        let rng = &mut validator::testonly::rng();
        let setup = Setup::new(rng, 4);
        let own = setup.keys[0].address();
        let sender = setup.keys[1].address();
        let backlog = Backlog::new(own, 100);

        let v = View::new(5, 1);
        backlog.store(sender, msg(&setup, 1, v, MsgCode::CommitVote));
        backlog.store(sender, msg(&setup, 1, v.next_round(), MsgCode::NewView));
        backlog.store(sender, msg(&setup, 1, v, MsgCode::PrepareVote));
        backlog.store(sender, msg(&setup, 1, v, MsgCode::PrepareVote));
        backlog.store(sender, msg(&setup, 1, View::new(4, 0), MsgCode::Prepare));
        assert_eq!(backlog.len(), 5);

        let mut got = vec![];
        backlog.process(v, |from, m| {
            assert_eq!(from, sender);
            got.push((m.view, m.code));
        });
        assert_eq!(
            got,
            vec![
                (v, MsgCode::PrepareVote),
                (v, MsgCode::PrepareVote),
                (v, MsgCode::CommitVote),
            ]
        );
        // The old message was discarded, the future one is kept.
        assert_eq!(backlog.len(), 1);

        got.clear();
        backlog.process(v.next_round(), |_, m| got.push((m.view, m.code)));
        assert_eq!(got, vec![(v.next_round(), MsgCode::NewView)]);
        assert_eq!(backlog.len(), 0);
    }

    #[test]
    fn decide_of_earlier_round_is_replayed() {
        let rng = &mut validator::testonly::rng();
        let setup = Setup::new(rng, 4);
        let backlog = Backlog::new(setup.keys[0].address(), 100);
        backlog.store(
            setup.keys[2].address(),
            msg(&setup, 2, View::new(3, 0), MsgCode::Decide),
        );
        let mut got = 0;
        backlog.process(View::new(3, 2), |_, m| {
            assert_eq!(m.code, MsgCode::Decide);
            got += 1;
        });
        assert_eq!(got, 1);
    }

    #[test]
    fn own_messages_are_not_stored() {
        let rng = &mut validator::testonly::rng();
        let setup = Setup::new(rng, 4);
        let own = setup.keys[0].address();
        let backlog = Backlog::new(own, 100);
        assert!(!backlog.store(own, msg(&setup, 0, View::new(2, 0), MsgCode::NewView)));
        assert_eq!(backlog.len(), 0);
    }

    #[test]
    fn capacity_is_per_sender() {
        let rng = &mut validator::testonly::rng();
        let setup = Setup::new(rng, 4);
        let backlog = Backlog::new(setup.keys[0].address(), 2);
        for i in 1..4 {
            let sender = setup.keys[i].address();
            for _ in 0..3 {
                let view = View::new(rng.gen_range(2..10), 0);
                backlog.store(sender, msg(&setup, i, view, MsgCode::NewView));
            }
        }
        assert_eq!(backlog.len(), 6);
    }

    #[test]
    fn equal_keys_replay_in_arrival_order() {
        let rng = &mut validator::testonly::rng();
        let setup = Setup::new(rng, 4);
        let sender = setup.keys[1].address();
        let backlog = Backlog::new(setup.keys[0].address(), 100);
        let view = View::new(2, 0);
        let digests: Vec<validator::NodeHash> = (0..5).map(|_| rng.gen()).collect();
        for digest in &digests {
            let m = msg_with_digest(&setup, 1, view, MsgCode::PrepareVote, *digest);
            assert!(backlog.store(sender, m));
        }
        let mut got = vec![];
        backlog.process(view, |_, m| match m.decode_payload().unwrap() {
            validator::ConsensusMsg::PrepareVote(v) => got.push(v.digest),
            payload => panic!("unexpected {payload:?}"),
        });
        assert_eq!(got, digests);
    }
}
