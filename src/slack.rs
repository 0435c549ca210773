//! Slack channel topic gateway.
//!
//! The [`TopicGateway`] trait decouples the sync runner from the Slack Web
//! API so tests can substitute an in-memory gateway. The real client speaks
//! the legacy form-encoded `conversations.info` / `conversations.setTopic`
//! surface.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::config::SlackConfig;
use crate::{AppError, Result};

/// Reads and writes a channel's raw topic text.
pub trait TopicGateway: Send + Sync {
    /// Fetch the current raw topic for `channel`.
    ///
    /// A channel without a topic yields an empty string, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Gateway`](crate::AppError::Gateway) if the
    /// request fails or the channel is not visible to the bot.
    fn topic(&self, channel: &str) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>>;

    /// Replace the topic for `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Gateway`](crate::AppError::Gateway) if the
    /// request fails or Slack rejects the update.
    fn set_topic(
        &self,
        channel: &str,
        topic: &str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Slack Web API client for channel topics.
pub struct SlackGateway {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl SlackGateway {
    /// Build a gateway from configuration, with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be constructed.
    pub fn new(config: &SlackConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_token: config.api_token.clone(),
        })
    }

    async fn call_api(&self, method: &str, form: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}/{method}", self.base_url);
        let response = self
            .http
            .post(&url)
            .form(form)
            .send()
            .await
            .map_err(|err| AppError::Gateway(format!("{method} request failed: {err}")))?;

        let body: Value = response
            .json()
            .await
            .map_err(|err| AppError::Gateway(format!("{method} returned non-JSON body: {err}")))?;

        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            let reason = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(AppError::Gateway(format!("{method} failed: {reason}")));
        }

        Ok(body)
    }

    async fn fetch_topic(&self, channel: &str) -> Result<String> {
        let body = self
            .call_api("conversations.info", &[("token", self.api_token.as_str()), ("channel", channel)])
            .await?;

        // A channel may legitimately have no topic set.
        let topic = body
            .pointer("/channel/topic/value")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();

        debug!(channel, topic = %topic, "fetched current topic");
        Ok(topic)
    }

    async fn write_topic(&self, channel: &str, topic: &str) -> Result<()> {
        self.call_api(
            "conversations.setTopic",
            &[
                ("token", self.api_token.as_str()),
                ("channel", channel),
                ("topic", topic),
            ],
        )
        .await?;

        debug!(channel, topic = %topic, "topic updated");
        Ok(())
    }
}

impl TopicGateway for SlackGateway {
    fn topic(&self, channel: &str) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        let channel = channel.to_owned();
        Box::pin(async move { self.fetch_topic(&channel).await })
    }

    fn set_topic(
        &self,
        channel: &str,
        topic: &str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let channel = channel.to_owned();
        let topic = topic.to_owned();
        Box::pin(async move { self.write_topic(&channel, &topic).await })
    }
}
