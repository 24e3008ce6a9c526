//! Build Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A build error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for build operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a build failure.
///
/// ### Configuration Errors
/// Abort the theme immediately and are never worth retrying:
/// - [`ErrorKind::Definition`]
/// - [`ErrorKind::UnknownTheme`]
/// - [`ErrorKind::InvalidItem`]
/// - [`ErrorKind::UnsupportedFilter`]
/// - [`ErrorKind::InvalidResource`]
///
/// ### Input Errors
/// - [`ErrorKind::MissingSource`]
/// - [`ErrorKind::Filter`] raised from [`ErrorKind::Compile`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Storage`]
/// - [`ErrorKind::Io`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Theme definition file could not be read or parsed.
    #[display("could not load theme definition: {}", _0.display())]
    Definition(#[error(not(source))] PathBuf),
    #[display("theme not found: {_0}")]
    UnknownTheme(#[error(not(source))] String),
    /// Item is missing a field its type requires.
    #[display("invalid definition for {_0}: {_1}")]
    InvalidItem(#[error(not(source))] String, #[error(not(source))] String),
    #[display("unsupported filter \"{filter}\" for {item}")]
    UnsupportedFilter {
        #[error(not(source))]
        item: String,
        #[error(not(source))]
        filter: String,
    },
    /// Options do not match the type derived from the resource name.
    #[display("invalid resource: {_0}")]
    InvalidResource(#[error(not(source))] String),
    #[display("source not found: {}", _0.display())]
    MissingSource(#[error(not(source))] PathBuf),
    /// A filter or minifier failed on the sources of an item.
    #[display("could not process sources of {_0}")]
    Filter(#[error(not(source))] String),
    #[display("compile error: {_0}")]
    Compile(#[error(not(source))] String),
    /// A repository read or write failed.
    #[display("storage error")]
    Storage,
    #[display("I/O error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage | Self::Io(_))
    }
}
