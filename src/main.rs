#![forbid(unsafe_code)]

//! `oncall-topic-sync` — on-call topic sync binary.
//!
//! Bootstraps configuration and credentials, scans the mapping store, and
//! runs one bounded-concurrency sync pass over every configured schedule.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use oncall_topic_sync::config::GlobalConfig;
use oncall_topic_sync::pagerduty::PagerDutyClient;
use oncall_topic_sync::slack::SlackGateway;
use oncall_topic_sync::sync::SyncRunner;
use oncall_topic_sync::{store, AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "oncall-topic-sync", about = "Sync Slack channel topics with on-call schedules", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the mapping-store path from the config file.
    #[arg(long)]
    store: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("oncall-topic-sync bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration and credentials ──────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    if let Some(store_path) = args.store {
        config.store_path = store_path;
    }
    config.load_credentials().await?;
    info!("configuration loaded");

    // ── Scan the mapping store ──────────────────────────
    let pool = store::connect(&config.store_path).await?;
    let items = store::scan(&pool).await?;
    info!(count = items.len(), "mapping store scanned");

    // ── Build collaborators and run one pass ────────────
    let timeout = Duration::from_secs(config.request_timeout_seconds);
    let resolver = Arc::new(PagerDutyClient::new(&config.pagerduty, timeout)?);
    let gateway = Arc::new(SlackGateway::new(&config.slack, timeout)?);
    let limit = usize::try_from(config.max_concurrent_updates)
        .map_err(|err| AppError::Config(format!("invalid concurrency limit: {err}")))?;

    let runner = SyncRunner::new(resolver, gateway, limit);
    let summary = runner.run(items).await;

    if summary.failed() {
        return Err(AppError::Resolve(format!(
            "{} schedule(s) failed to resolve, see previous errors",
            summary.resolve_failures
        )));
    }

    info!("oncall-topic-sync finished");
    Ok(())
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
