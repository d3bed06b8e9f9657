use std::fmt;

/// Block height.
pub type Height = u64;

/// Attempt number at a given height.
pub type Round = u64;

/// A (height, round) pair identifying one attempt to decide the block at
/// `height`. Ordered lexicographically: by height first, then by round.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct View {
    /// Height of the block being decided.
    pub height: Height,
    /// Attempt number at this height.
    pub round: Round,
}

impl View {
    /// Constructs a view.
    pub const fn new(height: Height, round: Round) -> Self {
        Self { height, round }
    }

    /// The view of the next round at the same height.
    pub fn next_round(self) -> Self {
        Self::new(self.height, self.round + 1)
    }

    /// The first view of the next height.
    pub fn next_height(self) -> Self {
        Self::new(self.height + 1, 0)
    }
}

impl fmt::Display for View {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}/{}", self.height, self.round)
    }
}

impl fmt::Debug for View {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, fmt)
    }
}
