//! Read-side facade over the repository.

use exn::ResultExt;
use std::collections::HashMap;
use themer_config::{Defaults, ResourceConfig};
use themer_storage::{Preset, RepositoryHandle, Resource};
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Fetches records for renders and knows the asset host of every theme.
///
/// One distributor is shared by all concurrent renders.
pub struct ResourceDistributor {
    repo: RepositoryHandle,
    defaults: Defaults,
    hosts: HashMap<String, String>,
}

impl ResourceDistributor {
    pub fn new(repo: RepositoryHandle, defaults: Defaults, hosts: HashMap<String, String>) -> Self {
        Self { repo, defaults, hosts }
    }

    pub fn from_config(repo: RepositoryHandle, config: &ResourceConfig) -> Self {
        Self::new(repo, config.defaults(), config.host.clone())
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    fn theme<'a>(&'a self, theme: Option<&'a str>) -> &'a str {
        theme.unwrap_or(&self.defaults.theme)
    }

    /// Asset host substituted for `%host%`, `/` for themes without one.
    pub fn host(&self, theme: Option<&str>) -> &str {
        self.hosts.get(self.theme(theme)).map_or("/", String::as_str)
    }

    #[instrument(skip_all, fields(name = %name))]
    pub async fn resource(&self, name: &str, theme: Option<&str>) -> Result<Option<Resource>> {
        let theme = self.theme(theme);
        let resource = self.repo.resource(theme, name).await.or_raise(|| ErrorKind::Storage)?;
        if resource.is_none() {
            tracing::debug!(theme, "Resource not registered");
        }
        Ok(resource)
    }

    /// Fetch a preset, the default preset when `name` is `None`.
    pub async fn preset(&self, name: Option<&str>, theme: Option<&str>) -> Result<Option<Preset>> {
        let name = name.unwrap_or(&self.defaults.preset);
        self.repo.preset(self.theme(theme), name).await.or_raise(|| ErrorKind::Storage)
    }
}
