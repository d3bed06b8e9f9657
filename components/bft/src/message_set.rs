//! Per-view collection of messages of one type.
use std::collections::BTreeMap;

use hotstuff_consensus_roles::validator;

/// Messages of one type received in one view, keyed by sender.
/// A sender contributes at most once, so `len()` counts distinct validators.
#[derive(Debug, Clone)]
pub(crate) struct MessageSet<T> {
    view: validator::View,
    messages: BTreeMap<validator::Address, T>,
}

impl<T> MessageSet<T> {
    pub(crate) fn new(view: validator::View) -> Self {
        Self {
            view,
            messages: BTreeMap::new(),
        }
    }

    /// View the set was created for.
    #[cfg(test)]
    pub(crate) fn view(&self) -> validator::View {
        self.view
    }

    /// Adds a message. Returns false, keeping the first message, if the
    /// sender has already contributed.
    pub(crate) fn add(&mut self, sender: validator::Address, msg: T) -> bool {
        if self.messages.contains_key(&sender) {
            tracing::trace!(
                "HotStuff replica - duplicate message from {sender} in view {}",
                self.view
            );
            return false;
        }
        self.messages.insert(sender, msg);
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.messages.len()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, sender: &validator::Address) -> bool {
        self.messages.contains_key(sender)
    }

    /// Messages in sender address order.
    pub(crate) fn values(&self) -> impl Iterator<Item = &T> {
        self.messages.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng as _;

    #[test]
    fn duplicate_sender_is_counted_once() {
        let rng = &mut validator::testonly::rng();
        let (a, b): (validator::Address, validator::Address) = (rng.gen(), rng.gen());
        let mut set = MessageSet::new(validator::View::new(1, 0));
        assert!(set.add(a, 1));
        assert!(!set.add(a, 2));
        assert!(set.add(b, 3));
        assert_eq!(set.len(), 2);
        assert!(set.contains(&a));
        // The first message of a sender wins.
        let mut values: Vec<_> = set.values().copied().collect();
        values.sort();
        assert_eq!(values, vec![1, 3]);
    }
}
