//! Bounded-concurrency sync runner.
//!
//! Dispatches one task per work item, bounded by a semaphore, and collects
//! a structured outcome per item. Channels inside one item are updated
//! strictly sequentially in configured order; items never affect each other.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};

use crate::models::work_item::{ChatBackend, WorkItem};
use crate::pagerduty::ScheduleResolver;
use crate::slack::TopicGateway;
use crate::sync::outcome::{ChannelOutcome, ItemOutcome, RunSummary};
use crate::topic;

/// Runs one full sync pass over all configured work items.
pub struct SyncRunner {
    resolver: Arc<dyn ScheduleResolver>,
    gateway: Arc<dyn TopicGateway>,
    limit: usize,
}

impl SyncRunner {
    /// Build a runner over the given collaborators.
    ///
    /// `limit` is the number of concurrency slots; a task must hold a slot
    /// for its entire lifetime. A zero limit is clamped to one.
    #[must_use]
    pub fn new(
        resolver: Arc<dyn ScheduleResolver>,
        gateway: Arc<dyn TopicGateway>,
        limit: usize,
    ) -> Self {
        Self {
            resolver,
            gateway,
            limit: limit.max(1),
        }
    }

    /// Process every work item and wait for all of them to finish.
    ///
    /// Per-item failures are isolated: they are recorded in the returned
    /// summary and never abort sibling items.
    pub async fn run(&self, items: Vec<WorkItem>) -> RunSummary {
        let semaphore = Arc::new(Semaphore::new(self.limit));
        let mut tasks = JoinSet::new();

        for item in items {
            let resolver = Arc::clone(&self.resolver);
            let gateway = Arc::clone(&self.gateway);
            let semaphore = Arc::clone(&semaphore);
            let span = info_span!("sync_item", schedule_id = %item.schedule_id);

            tasks.spawn(
                async move {
                    // The owned permit is dropped on every exit path, so a
                    // failing item can never leak its slot.
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(closed) => {
                            return ItemOutcome::ResolveFailed {
                                schedule_id: item.schedule_id,
                                reason: format!("concurrency slot pool closed: {closed}"),
                            };
                        }
                    };
                    sync_item(resolver.as_ref(), gateway.as_ref(), &item).await
                }
                .instrument(span),
            );
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => error!(%err, "sync task panicked"),
            }
        }

        let summary = RunSummary::from_outcomes(&outcomes);
        info!(
            items = summary.items,
            written = summary.written,
            skipped = summary.skipped,
            channel_failures = summary.channel_failures,
            resolve_failures = summary.resolve_failures,
            "sync pass complete"
        );
        summary
    }
}

/// Process a single work item: resolve, format, fan out over its channels.
async fn sync_item(
    resolver: &dyn ScheduleResolver,
    gateway: &dyn TopicGateway,
    item: &WorkItem,
) -> ItemOutcome {
    let schedule_id = item.schedule_id.clone();

    let assignment = match resolver.current_oncall(&schedule_id).await {
        Ok(assignment) => assignment,
        Err(err) => {
            error!(%err, "schedule not found or not valid");
            return ItemOutcome::ResolveFailed {
                schedule_id,
                reason: err.to_string(),
            };
        }
    };

    if item.backend == ChatBackend::Hipchat {
        error!(backend = %item.backend, "backend is not supported, ignoring this entry");
        return ItemOutcome::UnsupportedBackend {
            schedule_id,
            backend: item.backend,
        };
    }

    let Some(label) = assignment.topic_label() else {
        info!("schedule has no assigned person, nothing to update");
        return ItemOutcome::Unassigned { schedule_id };
    };

    if item.channels.is_empty() {
        return ItemOutcome::NoTarget { schedule_id };
    }

    // Channels are strictly sequential so per-item write order is
    // deterministic; a failed channel never blocks the next one.
    let mut channels = Vec::with_capacity(item.channels.len());
    for channel in &item.channels {
        channels.push(update_channel(gateway, channel, &label).await);
    }

    ItemOutcome::Synced {
        schedule_id,
        channels,
    }
}

/// Read, decode, compare, and (if needed) rewrite one channel topic.
async fn update_channel(
    gateway: &dyn TopicGateway,
    channel: &str,
    proposed_label: &str,
) -> ChannelOutcome {
    // An unreadable prior topic never blocks an update; proceed as if the
    // topic were empty.
    let raw = match gateway.topic(channel).await {
        Ok(raw) => raw,
        Err(err) => {
            warn!(channel, %err, "topic read failed, proceeding with empty topic");
            String::new()
        }
    };

    let decoded = topic::decode(&topic::normalize(&raw));
    if proposed_label == decoded.current_label {
        info!(channel, "topic is already current, not updating");
        return ChannelOutcome::Skipped {
            channel: channel.to_owned(),
        };
    }

    let encoded = topic::encode(proposed_label, &decoded.remainder);
    match gateway.set_topic(channel, &encoded).await {
        Ok(()) => {
            info!(channel, "topic updated");
            ChannelOutcome::Written {
                channel: channel.to_owned(),
            }
        }
        Err(err) => {
            error!(channel, %err, "topic write failed");
            ChannelOutcome::WriteFailed {
                channel: channel.to_owned(),
                reason: err.to_string(),
            }
        }
    }
}
