//! Process-wide configuration.
//!
//! Values are layered with [`figment`]: the serde defaults first, then an
//! optional config file (TOML, YAML or JSON, picked by extension), then
//! `THEMER_`-prefixed environment variables where `__` separates nested
//! keys (`THEMER_STORAGE__TYPE=redis`).

pub mod error;
mod resource;
mod storage;

pub use crate::resource::{Defaults, ResourceConfig};
pub use crate::storage::{RedisConfig, SqliteConfig, StorageConfig};
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Toml, Yaml};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "THEMER_";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub resource: ResourceConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from `path` (or the platform default location)
    /// merged with the environment.
    ///
    /// A missing file is not an error; the environment alone may supply
    /// everything.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => default_path(),
        };
        let mut figment = Figment::new();
        if let Some(path) = path {
            tracing::debug!(path = %path.display(), "Reading configuration file");
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract and validate from an already assembled [`Figment`].
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.resource.default_theme.is_empty() {
            exn::bail!(ErrorKind::Invalid("resource.default_theme must not be empty".to_string()));
        }
        if self.resource.default_preset.is_empty() {
            exn::bail!(ErrorKind::Invalid("resource.default_preset must not be empty".to_string()));
        }
        self.storage.validate()
    }
}

/// `config.toml` inside the platform configuration directory.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "themer").map(|dirs| dirs.config_dir().join("config.toml"))
}
