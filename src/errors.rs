//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Mapping-store failure when interacting with `SQLite`.
    Store(String),
    /// On-call schedule resolution failure (not found or malformed payload).
    Resolve(String),
    /// Chat gateway failure when reading or writing a channel topic.
    Gateway(String),
    /// Work item targets a chat backend this service does not support.
    Unsupported(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Store(msg) => write!(f, "store: {msg}"),
            Self::Resolve(msg) => write!(f, "resolve: {msg}"),
            Self::Gateway(msg) => write!(f, "gateway: {msg}"),
            Self::Unsupported(msg) => write!(f, "unsupported backend: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.to_string())
    }
}
