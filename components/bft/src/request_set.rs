//! Pending block requests, ordered by height.
use std::{collections::BTreeMap, sync::Mutex};

use hotstuff_consensus_roles::validator;

/// A block the local node asks to have decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The proposed block.
    pub block: validator::Block,
}

impl Request {
    /// Height the request is for.
    pub fn height(&self) -> validator::Height {
        self.block.number
    }
}

/// Requests for future heights.
///
/// At most one request is kept per height: a newer request for the same
/// height replaces the older one.
#[derive(Debug, Default)]
pub(crate) struct RequestSet {
    pending: Mutex<BTreeMap<validator::Height, Request>>,
}

impl RequestSet {
    pub(crate) fn store(&self, req: Request) {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        pending.insert(req.height(), req);
    }

    /// Removes and returns the request for `height`. Requests for lower
    /// heights are stale and dropped.
    pub(crate) fn take(&self, height: validator::Height) -> Option<Request> {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        *pending = pending.split_off(&height);
        pending.remove(&height)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}
