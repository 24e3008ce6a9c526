//! Render Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A render error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for render operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Missing records are not errors at render time: they are logged and left
/// out of the markup.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A request was made after the resolver composed its output.
    /// Use a fresh resolver per render.
    #[display("resources already resolved")]
    AlreadyResolved,
    #[display("invalid resource request: {_0}")]
    InvalidResource(#[error(not(source))] String),
    /// A repository read failed.
    #[display("storage error")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage)
    }
}
