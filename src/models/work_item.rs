//! One configured schedule→channel mapping to be kept in sync.

use std::fmt::{Display, Formatter};

/// Chat backend a work item targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatBackend {
    /// Slack — the only supported backend.
    Slack,
    /// `HipChat` — configured rows are logged and ignored.
    Hipchat,
}

impl Display for ChatBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Slack => write!(f, "slack"),
            Self::Hipchat => write!(f, "hipchat"),
        }
    }
}

/// One schedule→channels pairing, produced by a single mapping-store scan
/// and discarded after the run.
///
/// Channels keep their configured order; updates within an item are applied
/// sequentially in that order. An empty channel list is a no-op item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Schedule identifier (mapping-store primary key, never empty).
    pub schedule_id: String,
    /// Target channel identifiers in configured order.
    pub channels: Vec<String>,
    /// Which chat backend the channels belong to.
    pub backend: ChatBackend,
}

impl WorkItem {
    /// Build a Slack-targeted work item from a whitespace-delimited channel
    /// list, preserving order.
    #[must_use]
    pub fn slack(schedule_id: impl Into<String>, channels: &str) -> Self {
        Self {
            schedule_id: schedule_id.into(),
            channels: channels.split_whitespace().map(str::to_owned).collect(),
            backend: ChatBackend::Slack,
        }
    }
}
