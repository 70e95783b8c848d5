//! Error types for the sheet storage layer

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Row encoding/decoding failed
    #[error("Sheet encoding error: {0}")]
    Csv(String),

    /// The backing sheet has not been created yet
    #[error("Analytics sheet not initialized at {0}; run `cuemaster-analytics setup` first")]
    Uninitialized(PathBuf),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),

    /// The write lock is held by another request
    #[error("Lock conflict: {0}")]
    Conflict(String),

    /// Bounded lock wait expired
    #[error("Timeout: lock not acquired within {0:?}")]
    Timeout(std::time::Duration),

    /// Submission payload could not be parsed at all
    #[error("Malformed submission: {0}")]
    Malformed(String),
}

impl StoreError {
    /// Create a lock error
    pub fn lock<E: fmt::Display>(err: E) -> Self {
        Self::Lock(err.to_string())
    }

    /// Create a conflict error
    pub fn conflict<E: fmt::Display>(msg: E) -> Self {
        Self::Conflict(msg.to_string())
    }

    /// Create a malformed-input error
    pub fn malformed<E: fmt::Display>(msg: E) -> Self {
        Self::Malformed(msg.to_string())
    }

    /// Check if the caller may retry the operation as-is
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Lock(_) | Self::Conflict(_) | Self::Timeout(_)
        )
    }

    /// Check if this is a lock conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Check if the backing sheet is missing
    pub fn is_uninitialized(&self) -> bool {
        matches!(self, Self::Uninitialized(_))
    }
}

impl From<csv::Error> for StoreError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
