//! Structured per-item results and the run-level rollup.
//!
//! Every work item produces exactly one [`ItemOutcome`]; no failure kind
//! aborts sibling items. Only unresolved schedules make the overall run
//! report failure.

use crate::models::work_item::ChatBackend;

/// Result of one channel update attempt within a work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// The encoded topic was written.
    Written {
        /// Channel identifier.
        channel: String,
    },
    /// The topic already carried the proposed label; no write occurred.
    Skipped {
        /// Channel identifier.
        channel: String,
    },
    /// The write was attempted and rejected or failed in transport.
    WriteFailed {
        /// Channel identifier.
        channel: String,
        /// Failure description.
        reason: String,
    },
}

/// Result of processing one work item end to end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The schedule resolved and every channel was evaluated independently.
    Synced {
        /// Schedule identifier.
        schedule_id: String,
        /// Per-channel results in configured order.
        channels: Vec<ChannelOutcome>,
    },
    /// The schedule resolved but no channel is configured.
    NoTarget {
        /// Schedule identifier.
        schedule_id: String,
    },
    /// The schedule resolved with no assigned person; nothing to write.
    Unassigned {
        /// Schedule identifier.
        schedule_id: String,
    },
    /// The schedule could not be resolved; no gateway was contacted.
    ResolveFailed {
        /// Schedule identifier.
        schedule_id: String,
        /// Failure description.
        reason: String,
    },
    /// The item targets a backend this service does not support.
    UnsupportedBackend {
        /// Schedule identifier.
        schedule_id: String,
        /// The unsupported backend.
        backend: ChatBackend,
    },
}

/// Aggregated counts for one full sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Total work items processed.
    pub items: usize,
    /// Channel topics written.
    pub written: usize,
    /// Channel topics already current.
    pub skipped: usize,
    /// Channel writes that failed.
    pub channel_failures: usize,
    /// Schedules that failed to resolve.
    pub resolve_failures: usize,
    /// Items targeting an unsupported backend.
    pub unsupported: usize,
    /// Items with no channel configured.
    pub no_target: usize,
    /// Items whose schedule has no assigned person.
    pub unassigned: usize,
}

impl RunSummary {
    /// Fold per-item outcomes into run-level counts.
    #[must_use]
    pub fn from_outcomes(outcomes: &[ItemOutcome]) -> Self {
        let mut summary = Self {
            items: outcomes.len(),
            ..Self::default()
        };

        for outcome in outcomes {
            match outcome {
                ItemOutcome::Synced { channels, .. } => {
                    for channel in channels {
                        match channel {
                            ChannelOutcome::Written { .. } => summary.written += 1,
                            ChannelOutcome::Skipped { .. } => summary.skipped += 1,
                            ChannelOutcome::WriteFailed { .. } => summary.channel_failures += 1,
                        }
                    }
                }
                ItemOutcome::NoTarget { .. } => summary.no_target += 1,
                ItemOutcome::Unassigned { .. } => summary.unassigned += 1,
                ItemOutcome::ResolveFailed { .. } => summary.resolve_failures += 1,
                ItemOutcome::UnsupportedBackend { .. } => summary.unsupported += 1,
            }
        }

        summary
    }

    /// Whether the run should report failure to the invoker.
    ///
    /// Only unresolved schedules fail the invocation; gateway and
    /// configuration problems are logged and tolerated.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.resolve_failures > 0
    }
}
