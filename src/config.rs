//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Keychain service name used for credential lookups.
const KEYRING_SERVICE: &str = "oncall-topic-sync";

/// Nested `PagerDuty` configuration.
///
/// The API token is loaded at runtime via OS keychain or environment
/// variable, not from the TOML config file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PagerDutyConfig {
    /// Base URL of the `PagerDuty` REST API.
    #[serde(default = "default_pagerduty_url")]
    pub base_url: String,
    /// Display timezone sent with every schedule lookup.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    /// Bearer token for the REST API (populated at runtime).
    #[serde(skip)]
    pub api_token: String,
}

impl Default for PagerDutyConfig {
    fn default() -> Self {
        Self {
            base_url: default_pagerduty_url(),
            time_zone: default_time_zone(),
            api_token: String::new(),
        }
    }
}

/// Nested Slack configuration.
///
/// The API token is loaded at runtime via OS keychain or environment
/// variable, not from the TOML config file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SlackConfig {
    /// Base URL of the Slack Web API.
    #[serde(default = "default_slack_url")]
    pub base_url: String,
    /// Bot token used for topic reads and writes (populated at runtime).
    #[serde(skip)]
    pub api_token: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            base_url: default_slack_url(),
            api_token: String::new(),
        }
    }
}

fn default_pagerduty_url() -> String {
    "https://api.pagerduty.com".into()
}

fn default_time_zone() -> String {
    "America/New_York".into()
}

fn default_slack_url() -> String {
    "https://slack.com/api".into()
}

fn default_max_concurrent_updates() -> u32 {
    5
}

fn default_request_timeout_seconds() -> u64 {
    30
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Path to the `SQLite` file holding schedule→channel mappings.
    pub store_path: PathBuf,
    /// Maximum number of work items processed in parallel.
    ///
    /// Bounds burst load on the downstream APIs, not correctness.
    #[serde(default = "default_max_concurrent_updates")]
    pub max_concurrent_updates: u32,
    /// Per-request timeout applied to every external HTTP call.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    /// `PagerDuty` connectivity settings.
    #[serde(default)]
    pub pagerduty: PagerDutyConfig,
    /// Slack connectivity settings.
    #[serde(default)]
    pub slack: SlackConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load API credentials from OS keychain with env-var fallback.
    ///
    /// Tries the `oncall-topic-sync` keyring service first, then falls back
    /// to `PAGERDUTY_API_TOKEN` / `SLACK_API_TOKEN` environment variables.
    /// Tokens are fetched once per process and read-only afterwards.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither keychain nor env vars provide
    /// the required tokens.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.pagerduty.api_token =
            load_credential("pagerduty_api_token", "PAGERDUTY_API_TOKEN").await?;
        self.slack.api_token = load_credential("slack_api_token", "SLACK_API_TOKEN").await?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.max_concurrent_updates == 0 {
            return Err(AppError::Config(
                "max_concurrent_updates must be greater than zero".into(),
            ));
        }

        if self.store_path.as_os_str().is_empty() {
            return Err(AppError::Config("store_path must not be empty".into()));
        }

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // Keyring is synchronous I/O, so it runs under spawn_blocking.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    env::var(env_key).map_err(|_| {
        AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))
    })
}
