//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Backend could not be opened at startup. Not worth retrying.
    #[display("could not connect to storage backend")]
    Connection,
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// Networked backend command failed.
    #[display("network error")]
    Network,
    /// Stored payload could not be (de)serialized.
    #[display("invalid record data")]
    InvalidData,
    /// Options do not match the type derived from the resource name.
    #[display("invalid resource: {_0}")]
    InvalidResource(#[error(not(source))] String),
    /// Theme or name cannot be used as a storage key.
    #[display("invalid key: ({_0}, {_1})")]
    InvalidKey(#[error(not(source))] String, #[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database | Self::Network)
    }
}
