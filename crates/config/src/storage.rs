//! Storage backend selection.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ErrorKind, Result};

/// Which repository backend to open at startup, and how.
///
/// Selected once by the `type` key and fixed for the lifetime of the
/// process.
///
/// ```
/// use figment::{Figment, providers::{Format, Toml}};
/// use themer_config::StorageConfig;
///
/// let toml = Toml::string("type = \"sqlite\"\ndata_path = \"res.db\"");
/// let config: StorageConfig = Figment::from(toml).extract().unwrap();
/// assert!(matches!(config, StorageConfig::Sqlite(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    Sqlite(SqliteConfig),
    Redis(RedisConfig),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SqliteConfig {
    /// Location of the database file, created if missing.
    pub data_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "RedisConfig::default_host")]
    pub host: String,
    #[serde(default = "RedisConfig::default_port")]
    pub port: u16,
    #[serde(default)]
    pub password: Option<String>,
    pub database: i64,
    #[serde(default = "RedisConfig::default_namespace")]
    pub namespace: String,
    /// Record expiry, in seconds.
    #[serde(default = "RedisConfig::default_ttl")]
    pub ttl: f64,
    /// Connection URL of an already provisioned server. When present, the
    /// host, port, password and TTL settings are ignored.
    #[serde(default)]
    pub connection: Option<String>,
}
impl RedisConfig {
    fn default_host() -> String {
        "127.0.0.1".to_string()
    }

    fn default_port() -> u16 {
        6379
    }

    fn default_namespace() -> String {
        "assert".to_string()
    }

    fn default_ttl() -> f64 {
        2.5
    }

    /// Expiry applied to every write, or `None` when an external connection
    /// is reused.
    pub fn ttl(&self) -> Option<Duration> {
        match self.connection {
            Some(_) => None,
            None => Some(Duration::from_secs_f64(self.ttl)),
        }
    }
}

impl StorageConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Self::Sqlite(sqlite) => {
                if sqlite.data_path.as_os_str().is_empty() {
                    exn::bail!(ErrorKind::Invalid("storage.data_path must not be empty".to_string()));
                }
            },
            Self::Redis(redis) => {
                if redis.namespace.is_empty() {
                    exn::bail!(ErrorKind::Invalid("storage.namespace must not be empty".to_string()));
                }
                if redis.connection.is_none() && !(redis.ttl.is_finite() && redis.ttl > 0.0) {
                    exn::bail!(ErrorKind::Invalid(format!("storage.ttl must be a positive number, got {}", redis.ttl)));
                }
                if redis.connection.is_some() {
                    tracing::debug!(
                        namespace = %redis.namespace,
                        "External redis connection configured, ignoring host/port/password/ttl"
                    );
                }
            },
        }
        Ok(())
    }
}
