//! Sync orchestration modules.
//!
//! Covers the bounded-concurrency run over all configured work items and
//! the structured per-item outcome reporting.

pub mod outcome;
pub mod runner;

pub use outcome::{ChannelOutcome, ItemOutcome, RunSummary};
pub use runner::SyncRunner;
