#![forbid(unsafe_code)]

//! Keeps Slack channel topics in sync with `PagerDuty` on-call schedules.
//!
//! A topic line is split into a managed on-call label and a free-form
//! remainder; each run rewrites only the label, preserves the remainder,
//! and skips the write entirely when nothing changed.

pub mod config;
pub mod errors;
pub mod models;
pub mod pagerduty;
pub mod slack;
pub mod store;
pub mod sync;
pub mod topic;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
