//! Configuration of the consensus core.
use std::time::Duration;

use hotstuff_consensus_roles::validator;

/// Round timeouts stop growing after this many doublings.
const MAX_TIMEOUT_EXPONENT: u64 = 8;

/// Configuration of the bft component.
#[derive(Debug, Clone)]
pub struct Config {
    /// The validator's secret key.
    pub secret_key: validator::SecretKey,
    /// Base duration of a round before a round change is triggered.
    pub request_timeout: Duration,
    /// Expected interval between blocks. The round timeout grows
    /// exponentially in multiples of it.
    pub block_period: Duration,
    /// Maximum number of future messages buffered per sender.
    pub max_backlog_per_sender: usize,
}

impl Config {
    /// Creates a config with default timings.
    pub fn new(secret_key: validator::SecretKey) -> Self {
        Self {
            secret_key,
            request_timeout: Duration::from_secs(3),
            block_period: Duration::from_secs(1),
            max_backlog_per_sender: 1000,
        }
    }

    /// Duration of the given round: `request_timeout + block_period * 2^min(round, 8)`.
    pub fn round_timeout(&self, round: validator::Round) -> Duration {
        let exp = round.min(MAX_TIMEOUT_EXPONENT) as u32;
        self.request_timeout + self.block_period * 2u32.pow(exp)
    }
}
