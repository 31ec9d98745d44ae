//! Error types for gate operations.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur around the migration gate.
///
/// A denied acquisition is not an error: `try_acquire` reports it as `false`.
#[derive(Error, Debug)]
pub enum GateError {
    /// Waiting for completion was cancelled through its cancellation handle.
    #[error("wait for completion was cancelled")]
    Cancelled,

    /// A bounded wait for completion expired.
    #[error("wait for completion timed out after {0:?}")]
    Timeout(Duration),

    /// Scheduled task settings that cannot be executed.
    #[error("invalid scheduled task settings: {0}")]
    InvalidSettings(String),

    /// Settings file could not be read, parsed or written.
    #[error("configuration error: {0}")]
    Config(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The protected migration work failed.
    #[error("migration job failed: {0}")]
    Job(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl GateError {
    /// Returns true if this is the cancelled outcome of a wait.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type for gate operations.
pub type GateResult<T> = Result<T, GateError>;
