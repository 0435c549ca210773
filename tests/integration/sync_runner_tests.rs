//! Integration tests for the bounded-concurrency sync runner, using
//! in-memory resolver/gateway doubles with atomic instrumentation.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::DateTime;
use oncall_topic_sync::models::assignment::OnCallAssignment;
use oncall_topic_sync::models::work_item::{ChatBackend, WorkItem};
use oncall_topic_sync::pagerduty::ScheduleResolver;
use oncall_topic_sync::slack::TopicGateway;
use oncall_topic_sync::sync::SyncRunner;
use oncall_topic_sync::{AppError, Result};
use tokio::time::sleep;

const LABEL: &str = "Jane Doe is on-call from 01/02/2024 09:00AM to 01/02/2024 05:00PM";

// ── test doubles ─────────────────────────────────────────────────────────────

/// Resolver double that tracks how many lookups run concurrently.
struct StubResolver {
    assignment: OnCallAssignment,
    failing: HashSet<String>,
    delay: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
    calls: AtomicUsize,
}

impl StubResolver {
    fn new(assignment: OnCallAssignment) -> Self {
        Self {
            assignment,
            failing: HashSet::new(),
            delay: Duration::ZERO,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

impl ScheduleResolver for StubResolver {
    fn current_oncall(
        &self,
        schedule_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<OnCallAssignment>> + Send + '_>> {
        let schedule_id = schedule_id.to_owned();
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(&schedule_id) {
                return Err(AppError::Resolve(format!(
                    "schedule {schedule_id} not found"
                )));
            }
            Ok(self.assignment.clone())
        })
    }
}

/// Gateway double backed by an in-memory topic map.
#[derive(Default)]
struct MemoryGateway {
    topics: Mutex<HashMap<String, String>>,
    fail_reads: HashSet<String>,
    fail_writes: HashSet<String>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryGateway {
    fn with_topic(channel: &str, topic: &str) -> Self {
        let gateway = Self::default();
        gateway
            .topics
            .lock()
            .expect("lock")
            .insert(channel.to_owned(), topic.to_owned());
        gateway
    }

    fn stored_topic(&self, channel: &str) -> Option<String> {
        self.topics.lock().expect("lock").get(channel).cloned()
    }
}

impl TopicGateway for MemoryGateway {
    fn topic(&self, channel: &str) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        let channel = channel.to_owned();
        Box::pin(async move {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail_reads.contains(&channel) {
                return Err(AppError::Gateway(format!("cannot read {channel}")));
            }
            Ok(self
                .topics
                .lock()
                .expect("lock")
                .get(&channel)
                .cloned()
                .unwrap_or_default())
        })
    }

    fn set_topic(
        &self,
        channel: &str,
        topic: &str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let channel = channel.to_owned();
        let topic = topic.to_owned();
        Box::pin(async move {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes.contains(&channel) {
                return Err(AppError::Gateway(format!("cannot write {channel}")));
            }
            self.topics.lock().expect("lock").insert(channel, topic);
            Ok(())
        })
    }
}

// ── fixtures ─────────────────────────────────────────────────────────────────

fn jane_doe() -> OnCallAssignment {
    OnCallAssignment {
        person: Some("Jane Doe".to_owned()),
        start: DateTime::parse_from_rfc3339("2024-01-02T09:00:00-05:00").expect("start"),
        end: DateTime::parse_from_rfc3339("2024-01-02T17:00:00-05:00").expect("end"),
    }
}

fn items(count: usize) -> Vec<WorkItem> {
    (0..count)
        .map(|i| WorkItem::slack(format!("SCHED{i}"), &format!("C{i}")))
        .collect()
}

// ── concurrency bound ────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn at_most_limit_tasks_hold_a_slot_concurrently() {
    let mut resolver = StubResolver::new(jane_doe());
    resolver.delay = Duration::from_millis(25);
    let resolver = Arc::new(resolver);
    let gateway = Arc::new(MemoryGateway::default());

    let runner = SyncRunner::new(resolver.clone(), gateway.clone(), 5);
    let summary = runner.run(items(12)).await;

    assert_eq!(summary.items, 12);
    assert_eq!(summary.written, 12);
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 12);
    assert!(resolver.max_active.load(Ordering::SeqCst) <= 5);
}

// ── fault isolation ──────────────────────────────────────────────────────────

#[tokio::test]
async fn one_failing_schedule_does_not_block_the_others() {
    let mut resolver = StubResolver::new(jane_doe());
    resolver.failing.insert("SCHED3".to_owned());
    let resolver = Arc::new(resolver);
    let gateway = Arc::new(MemoryGateway::default());

    let runner = SyncRunner::new(resolver.clone(), gateway.clone(), 5);
    let summary = runner.run(items(12)).await;

    assert_eq!(summary.items, 12);
    assert_eq!(summary.resolve_failures, 1);
    assert_eq!(summary.written, 11);
    assert!(summary.failed());
}

#[tokio::test]
async fn a_failing_channel_write_does_not_block_item_siblings() {
    let resolver = Arc::new(StubResolver::new(jane_doe()));
    let mut gateway = MemoryGateway::default();
    gateway.fail_writes.insert("C1".to_owned());
    let gateway = Arc::new(gateway);

    let item = WorkItem::slack("SCHED1", "C1 C2");
    let runner = SyncRunner::new(resolver.clone(), gateway.clone(), 5);
    let summary = runner.run(vec![item]).await;

    assert_eq!(summary.channel_failures, 1);
    assert_eq!(summary.written, 1);
    assert!(!summary.failed());
    assert!(gateway.stored_topic("C2").is_some());
}

// ── idempotence ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn second_run_with_the_same_assignment_writes_nothing() {
    let resolver = Arc::new(StubResolver::new(jane_doe()));
    let gateway = Arc::new(MemoryGateway::default());
    let runner = SyncRunner::new(resolver.clone(), gateway.clone(), 5);

    let first = runner.run(items(1)).await;
    assert_eq!(first.written, 1);
    assert_eq!(first.skipped, 0);

    let second = runner.run(items(1)).await;
    assert_eq!(second.written, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(gateway.writes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn update_preserves_the_freeform_remainder() {
    let resolver = Arc::new(StubResolver::new(jane_doe()));
    let gateway = Arc::new(MemoryGateway::with_topic(
        "C0",
        "Old Name is on-call from 12/31/2023 09:00AM to 12/31/2023 05:00PM | runbook: example.com",
    ));
    let runner = SyncRunner::new(resolver.clone(), gateway.clone(), 5);

    let summary = runner.run(items(1)).await;

    assert_eq!(summary.written, 1);
    assert_eq!(
        gateway.stored_topic("C0").as_deref(),
        Some(format!("{LABEL} | runbook: example.com").as_str())
    );
}

// ── multi-channel fan-out ────────────────────────────────────────────────────

#[tokio::test]
async fn a_two_channel_item_yields_two_independent_writes() {
    let resolver = Arc::new(StubResolver::new(jane_doe()));
    let gateway = Arc::new(MemoryGateway::default());
    let runner = SyncRunner::new(resolver.clone(), gateway.clone(), 5);

    let summary = runner.run(vec![WorkItem::slack("SCHED1", "C1 C2")]).await;

    assert_eq!(summary.written, 2);
    assert_eq!(gateway.writes.load(Ordering::SeqCst), 2);
    assert!(gateway.stored_topic("C1").is_some());
    assert!(gateway.stored_topic("C2").is_some());
}

// ── degraded reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn an_unreadable_topic_is_treated_as_empty_and_still_updated() {
    let resolver = Arc::new(StubResolver::new(jane_doe()));
    let mut gateway = MemoryGateway::default();
    gateway.fail_reads.insert("C0".to_owned());
    let gateway = Arc::new(gateway);
    let runner = SyncRunner::new(resolver.clone(), gateway.clone(), 5);

    let summary = runner.run(items(1)).await;

    assert_eq!(summary.written, 1);
    // An empty prior topic decodes to the "." placeholder remainder.
    assert_eq!(
        gateway.stored_topic("C0").as_deref(),
        Some(format!("{LABEL} | .").as_str())
    );
}

// ── non-update outcomes ──────────────────────────────────────────────────────

#[tokio::test]
async fn hipchat_items_never_contact_the_gateway() {
    let resolver = Arc::new(StubResolver::new(jane_doe()));
    let gateway = Arc::new(MemoryGateway::default());
    let runner = SyncRunner::new(resolver.clone(), gateway.clone(), 5);

    let item = WorkItem {
        schedule_id: "SCHED1".to_owned(),
        channels: vec!["lobby".to_owned()],
        backend: ChatBackend::Hipchat,
    };
    let summary = runner.run(vec![item]).await;

    assert_eq!(summary.unsupported, 1);
    assert_eq!(gateway.reads.load(Ordering::SeqCst), 0);
    assert_eq!(gateway.writes.load(Ordering::SeqCst), 0);
    assert!(!summary.failed());
}

#[tokio::test]
async fn an_unassigned_schedule_is_a_noop_not_an_error() {
    let mut assignment = jane_doe();
    assignment.person = None;
    let resolver = Arc::new(StubResolver::new(assignment));
    let gateway = Arc::new(MemoryGateway::default());
    let runner = SyncRunner::new(resolver.clone(), gateway.clone(), 5);

    let summary = runner.run(items(1)).await;

    assert_eq!(summary.unassigned, 1);
    assert_eq!(gateway.writes.load(Ordering::SeqCst), 0);
    assert!(!summary.failed());
}

#[tokio::test]
async fn an_item_without_channels_is_counted_as_no_target() {
    let resolver = Arc::new(StubResolver::new(jane_doe()));
    let gateway = Arc::new(MemoryGateway::default());
    let runner = SyncRunner::new(resolver.clone(), gateway.clone(), 5);

    let summary = runner.run(vec![WorkItem::slack("SCHED1", "")]).await;

    assert_eq!(summary.no_target, 1);
    assert_eq!(gateway.writes.load(Ordering::SeqCst), 0);
}
