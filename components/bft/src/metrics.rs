//! Metrics for the consensus core.

use std::time::Duration;

use hotstuff_consensus_roles::validator;
use vise::{
    Buckets, Counter, EncodeLabelSet, EncodeLabelValue, Family, Gauge, Histogram, Metrics, Unit,
};

/// Label for a protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EncodeLabelValue)]
#[metrics(rename_all = "snake_case")]
pub(crate) enum MsgLabel {
    NewView,
    Prepare,
    PrepareVote,
    PreCommit,
    PreCommitVote,
    Commit,
    CommitVote,
    Decide,
}

impl From<validator::MsgCode> for MsgLabel {
    fn from(code: validator::MsgCode) -> Self {
        use validator::MsgCode as C;
        match code {
            C::NewView => Self::NewView,
            C::Prepare => Self::Prepare,
            C::PrepareVote => Self::PrepareVote,
            C::PreCommit => Self::PreCommit,
            C::PreCommitVote => Self::PreCommitVote,
            C::Commit => Self::Commit,
            C::CommitVote => Self::CommitVote,
            C::Decide => Self::Decide,
        }
    }
}

impl MsgLabel {
    /// Attaches a result to this label.
    pub(crate) fn with_result<E>(self, result: &Result<(), E>) -> ProcessingLatencyLabels {
        ProcessingLatencyLabels {
            r#type: self,
            result: match result {
                Ok(()) => ResultLabel::Ok,
                Err(_) => ResultLabel::Err,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EncodeLabelValue)]
#[metrics(rename_all = "snake_case")]
enum ResultLabel {
    Ok,
    Err,
}

/// Labels for processing latency metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EncodeLabelSet)]
pub(crate) struct ProcessingLatencyLabels {
    r#type: MsgLabel,
    result: ResultLabel,
}

/// Metrics defined by the consensus core.
#[derive(Debug, Metrics)]
#[metrics(prefix = "hotstuff")]
pub(crate) struct ConsensusMetrics {
    /// Height of the current view.
    pub(crate) view_height: Gauge<u64>,
    /// Round of the current view.
    pub(crate) view_round: Gauge<u64>,
    /// Height of the last block committed by this node.
    pub(crate) finalized_height: Gauge<u64>,
    /// Number of round changes, i.e. rounds that timed out.
    pub(crate) round_changes: Counter,
    /// Number of future messages waiting in the backlog.
    pub(crate) backlog_size: Gauge<u64>,
    /// Latency of a round, from its start until the block is committed.
    #[metrics(buckets = Buckets::exponential(0.125..=64.0, 2.0), unit = Unit::Seconds)]
    pub(crate) commit_latency: Histogram<Duration>,
    /// Latency of processing messages.
    #[metrics(buckets = Buckets::LATENCIES, unit = Unit::Seconds)]
    pub(crate) message_processing_latency: Family<ProcessingLatencyLabels, Histogram<Duration>>,
}

/// Global instance of [`ConsensusMetrics`].
#[vise::register]
pub(crate) static METRICS: vise::Global<ConsensusMetrics> = vise::Global::new();
