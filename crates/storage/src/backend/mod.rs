//! Repository trait and backend implementations.
//!
//! This module defines the [`ResourceRepository`] trait, a keyed store of
//! [`Record`]s addressed by `(theme, name)`, and the backends implementing
//! it (embedded SQLite file, Redis, plus decorators and test doubles).

#[cfg(feature = "mock")]
mod mock;
mod redis;
mod ro;
mod sqlite;

#[cfg(feature = "mock")]
pub use self::mock::MockRepository;
pub use self::redis::RedisRepository;
pub use self::ro::ReadOnlyRepository;
pub use self::sqlite::SqliteRepository;
use crate::error::{ErrorKind, Result};
use crate::models::{Preset, Record, Resource};
use async_trait::async_trait;

/// Unified interface for record storage.
///
/// No business logic lives here: backends persist whatever [`Record`] they
/// are given and hand it back unchanged. Every method takes `&self` so a
/// single handle can be shared across concurrent renders.
///
/// # Examples
///
/// ```
/// use themer_storage::{Preset, Record, backend::ResourceRepository, error::Result};
///
/// async fn register_default(repo: &dyn ResourceRepository) -> Result<()> {
///     let preset = Preset { name: "default".into(), items: vec!["app.css".into()], appendable: false };
///     repo.put("main", "default", &Record::Preset(preset)).await?;
///     assert!(repo.preset("main", "default").await?.is_some());
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    /// Name of the backend, for logging only.
    fn name(&self) -> &str;

    /// Fetch the record stored under `(theme, name)`.
    async fn get(&self, theme: &str, name: &str) -> Result<Option<Record>>;

    /// Insert or fully replace the record stored under `(theme, name)`.
    ///
    /// `name` must equal [`Record::name`]; anything else is rejected with
    /// [`InvalidKey`](ErrorKind::InvalidKey).
    async fn put(&self, theme: &str, name: &str, record: &Record) -> Result<()>;

    /// Remove the record stored under `(theme, name)`. Removing a key that
    /// does not exist succeeds.
    async fn delete(&self, theme: &str, name: &str) -> Result<()>;

    /// Fetch a resource, treating a preset stored under the same key as a
    /// miss.
    async fn resource(&self, theme: &str, name: &str) -> Result<Option<Resource>> {
        Ok(match self.get(theme, name).await? {
            Some(Record::Resource(resource)) => Some(resource),
            _ => None,
        })
    }

    /// Fetch a preset, treating a resource stored under the same key as a
    /// miss.
    async fn preset(&self, theme: &str, name: &str) -> Result<Option<Preset>> {
        Ok(match self.get(theme, name).await? {
            Some(Record::Preset(preset)) => Some(preset),
            _ => None,
        })
    }
}

/// Reject keys that cannot be stored unambiguously by every backend.
///
/// Themes become a `:`-separated segment of networked keys, so they may not
/// contain one.
pub(crate) fn validate_key(theme: &str, name: &str) -> Result<()> {
    if theme.is_empty() || name.is_empty() || theme.contains(':') {
        exn::bail!(ErrorKind::InvalidKey(theme.to_string(), name.to_string()));
    }
    Ok(())
}

pub(crate) fn validate_put(theme: &str, name: &str, record: &Record) -> Result<()> {
    validate_key(theme, name)?;
    if record.name() != name {
        exn::bail!(ErrorKind::InvalidKey(theme.to_string(), record.name().to_string()));
    }
    Ok(())
}
