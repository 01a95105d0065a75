//! Error types for startup validation and tick sources.

use thiserror::Error;

/// Configuration and wiring errors. These terminate the process at startup.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("no note ids configured (set NOTE_IDS)")]
    MissingNoteIds,

    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),

    #[error("invalid time zone {0:?}")]
    InvalidTimeZone(String),

    #[error("invalid target time {hour:02}:{minute:02}")]
    InvalidTargetTime { hour: u32, minute: u32 },

    #[error("invalid note id {0:?}")]
    InvalidNoteId(String),

    #[error("invalid decimal amount {0:?}")]
    InvalidAmount(String),

    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("invalid backoff policy: {0}")]
    InvalidBackoff(String),

    #[error("failed to load config {path}: {reason}")]
    Config { path: String, reason: String },
}

/// Failure reported by a tick stream. Every variant drives a reconnect.
#[derive(Debug, Clone, Error)]
pub enum TickSourceError {
    #[error("subscription failed: {0}")]
    Subscribe(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("poll failed: {0}")]
    Poll(String),
}

impl TickSourceError {
    pub fn subscribe(err: impl std::fmt::Display) -> Self {
        Self::Subscribe(err.to_string())
    }

    pub fn poll(err: impl std::fmt::Display) -> Self {
        Self::Poll(err.to_string())
    }
}
