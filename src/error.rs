//! Replay error types.

use thiserror::Error;

/// Errors produced while configuring a replay or reading events.
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("time scale must be > 0, got {0}")]
    InvalidScale(f64),

    #[error("invalid log line {line:?}: {reason}")]
    InvalidLine { line: String, reason: String },

    #[error("timestamp error: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReplayError>;
