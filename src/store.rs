//! Schedule→channel mapping store backed by `SQLite`.
//!
//! One row per schedule. The table is scanned once per run; rows are never
//! written by this service.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::warn;

use crate::models::work_item::{ChatBackend, WorkItem};
use crate::Result;

/// Idempotent table definition, safe to re-run on every startup.
const DDL: &str = r"
CREATE TABLE IF NOT EXISTS oncall_sync (
    schedule    TEXT PRIMARY KEY NOT NULL,
    slack       TEXT,
    hipchat     TEXT
);
";

#[derive(sqlx::FromRow)]
struct MappingRow {
    schedule: String,
    slack: Option<String>,
    hipchat: Option<String>,
}

impl MappingRow {
    /// Classify a row into a work item.
    ///
    /// A row with a `slack` value targets Slack; otherwise a `hipchat` value
    /// targets the unsupported `HipChat` backend; a row with neither has no
    /// target configured and becomes an empty no-op item.
    fn into_item(self) -> WorkItem {
        if let Some(channels) = self.slack {
            return WorkItem::slack(self.schedule, &channels);
        }

        if let Some(channels) = self.hipchat {
            return WorkItem {
                schedule_id: self.schedule,
                channels: channels.split_whitespace().map(str::to_owned).collect(),
                backend: ChatBackend::Hipchat,
            };
        }

        warn!(schedule_id = %self.schedule, "no target configured for schedule");
        WorkItem {
            schedule_id: self.schedule,
            channels: Vec::new(),
            backend: ChatBackend::Slack,
        }
    }
}

/// Open the mapping store at `path` and apply the schema.
///
/// # Errors
///
/// Returns `AppError::Store` if the file cannot be opened or the DDL fails.
pub async fn connect(path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    bootstrap_schema(&pool).await?;
    Ok(pool)
}

/// Open an in-memory mapping store for tests.
///
/// # Errors
///
/// Returns `AppError::Store` if the connection or the DDL fails.
pub async fn connect_memory() -> Result<SqlitePool> {
    // A single connection so every query sees the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    bootstrap_schema(&pool).await?;
    Ok(pool)
}

async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(DDL).execute(pool).await?;
    Ok(())
}

/// Scan every configured mapping, in stable schedule order.
///
/// Rows with an empty schedule key are dropped with a warning rather than
/// failing the run.
///
/// # Errors
///
/// Returns `AppError::Store` if the scan query fails.
pub async fn scan(pool: &SqlitePool) -> Result<Vec<WorkItem>> {
    let rows: Vec<MappingRow> =
        sqlx::query_as("SELECT schedule, slack, hipchat FROM oncall_sync ORDER BY schedule")
            .fetch_all(pool)
            .await?;

    let items = rows
        .into_iter()
        .filter_map(|row| {
            if row.schedule.is_empty() {
                warn!("dropping mapping row with empty schedule key");
                return None;
            }
            Some(row.into_item())
        })
        .collect();

    Ok(items)
}

/// Insert or replace one mapping row (used by fixtures and onboarding).
///
/// # Errors
///
/// Returns `AppError::Store` if the insert fails.
pub async fn upsert_mapping(
    pool: &SqlitePool,
    schedule: &str,
    slack: Option<&str>,
    hipchat: Option<&str>,
) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO oncall_sync (schedule, slack, hipchat) VALUES (?1, ?2, ?3)")
        .bind(schedule)
        .bind(slack)
        .bind(hipchat)
        .execute(pool)
        .await?;
    Ok(())
}
