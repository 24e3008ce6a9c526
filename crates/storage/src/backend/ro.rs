//! Read-only repository decorator.
//!
//! Wraps another repository and prevents write operations from executing,
//! while still indicating success on return. Used for dry-run builds.

use async_trait::async_trait;

use crate::backend::validate_put;
use crate::error::Result;
use crate::models::Record;
use crate::{RepositoryHandle, ResourceRepository};

/// Read-only repository.
///
/// Reads go to the wrapped repository; writes and deletes are dropped with an
/// [`info event`](tracing::Event).
#[derive(Clone)]
pub struct ReadOnlyRepository {
    inner: RepositoryHandle,
}
impl ReadOnlyRepository {
    pub fn new(inner: RepositoryHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ResourceRepository for ReadOnlyRepository {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get(&self, theme: &str, name: &str) -> Result<Option<Record>> {
        self.inner.get(theme, name).await
    }

    async fn put(&self, theme: &str, name: &str, record: &Record) -> Result<()> {
        validate_put(theme, name, record)?;
        tracing::info!(backend = self.inner.name(), theme, name, "Skipping write during read-only mode");
        Ok(())
    }

    async fn delete(&self, theme: &str, name: &str) -> Result<()> {
        tracing::info!(backend = self.inner.name(), theme, name, "Skipping delete during read-only mode");
        Ok(())
    }
}
