//! `PagerDuty` schedule resolution.
//!
//! The [`ScheduleResolver`] trait decouples the sync runner from the
//! `PagerDuty` REST API so tests can substitute an in-memory resolver.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::DateTime;
use serde::Deserialize;
use tracing::debug;

use crate::config::PagerDutyConfig;
use crate::models::assignment::OnCallAssignment;
use crate::{AppError, Result};

/// Resolves a schedule identifier to the current on-call assignment.
pub trait ScheduleResolver: Send + Sync {
    /// Look up the current on-call assignment for `schedule_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Resolve`](crate::AppError::Resolve) if the
    /// schedule is unknown, the request fails, or the payload lacks the
    /// expected shape.
    fn current_oncall(
        &self,
        schedule_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<OnCallAssignment>> + Send + '_>>;
}

#[derive(Debug, Deserialize)]
struct OncallsResponse {
    oncalls: Vec<OncallEntry>,
}

#[derive(Debug, Deserialize)]
struct OncallEntry {
    start: String,
    end: String,
    user: Option<UserSummary>,
}

#[derive(Debug, Deserialize)]
struct UserSummary {
    summary: Option<String>,
}

/// `PagerDuty` REST API client for the `/oncalls` endpoint.
pub struct PagerDutyClient {
    http: reqwest::Client,
    base_url: String,
    time_zone: String,
    api_token: String,
}

impl PagerDutyClient {
    /// Build a client from configuration, with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be constructed.
    pub fn new(config: &PagerDutyConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            time_zone: config.time_zone.clone(),
            api_token: config.api_token.clone(),
        })
    }

    async fn fetch_oncall(&self, schedule_id: &str) -> Result<OnCallAssignment> {
        let url = format!("{}/oncalls", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.pagerduty+json;version=2")
            .header("Authorization", format!("Token token={}", self.api_token))
            .query(&[
                ("time_zone", self.time_zone.as_str()),
                ("schedule_ids[]", schedule_id),
            ])
            .send()
            .await
            .map_err(|err| AppError::Resolve(format!("oncalls request failed: {err}")))?;

        let status = response.status();
        let body: OncallsResponse = response.json().await.map_err(|err| {
            AppError::Resolve(format!(
                "malformed oncalls payload (status {status}): {err}"
            ))
        })?;

        let entry = body
            .oncalls
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Resolve(format!("schedule {schedule_id} has no oncalls")))?;

        debug!(schedule_id, start = %entry.start, end = %entry.end, "resolved oncall entry");
        entry_to_assignment(entry)
    }
}

impl ScheduleResolver for PagerDutyClient {
    fn current_oncall(
        &self,
        schedule_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<OnCallAssignment>> + Send + '_>> {
        let schedule_id = schedule_id.to_owned();
        Box::pin(async move { self.fetch_oncall(&schedule_id).await })
    }
}

/// Convert a raw on-call entry into the domain assignment.
///
/// Timestamps arrive as ISO-8601 with a UTC offset; either failing to parse
/// is a resolution failure.
fn entry_to_assignment(entry: OncallEntry) -> Result<OnCallAssignment> {
    let start = DateTime::parse_from_rfc3339(&entry.start)
        .map_err(|err| AppError::Resolve(format!("invalid oncall start time: {err}")))?;
    let end = DateTime::parse_from_rfc3339(&entry.end)
        .map_err(|err| AppError::Resolve(format!("invalid oncall end time: {err}")))?;

    Ok(OnCallAssignment {
        person: entry.user.and_then(|user| user.summary),
        start,
        end,
    })
}
