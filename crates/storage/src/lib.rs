//! Persistence of themed resource and preset records.
//!
//! Records are keyed by `(theme, name)` and stored behind the
//! [`ResourceRepository`] trait. The backend is picked once at startup from
//! configuration with [`connect`].

pub mod backend;
pub mod codec;
pub mod error;
mod models;

pub use crate::backend::ResourceRepository;
pub use crate::models::{
    CssOptions, IconOptions, JsOptions, Placement, Preset, Record, Resource, ResourceOptions, ResourceType, Source,
};
use crate::backend::{RedisRepository, SqliteRepository};
use crate::error::Result;
use std::sync::Arc;
use themer_config::StorageConfig;

pub type RepositoryHandle = Arc<dyn ResourceRepository + Send + Sync>;

/// Open the backend selected by `config`.
///
/// Any failure here is meant to stop the process: there is no lazy
/// reconnection later on.
pub async fn connect(config: &StorageConfig) -> Result<RepositoryHandle> {
    let repo: RepositoryHandle = match config {
        StorageConfig::Sqlite(sqlite) => Arc::new(SqliteRepository::connect(&sqlite.data_path).await?),
        StorageConfig::Redis(redis) => Arc::new(RedisRepository::connect(redis).await?),
    };
    tracing::info!(backend = repo.name(), "Resource repository ready");
    Ok(repo)
}
