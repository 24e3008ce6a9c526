//! Write-side facade over the repository.

use exn::ResultExt;
use themer_config::Defaults;
use themer_storage::{Preset, Record, RepositoryHandle, Resource, ResourceOptions, ResourceType, Source};
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Normalizes resource and preset descriptors and stores them.
///
/// Every call is a full replace: options given to an earlier call for the
/// same name are not merged into later ones. A record identical to the stored
/// one is not written again, whatever the backend. A missing theme falls back
/// to the default theme.
#[derive(Clone)]
pub struct ResourceManager {
    repo: RepositoryHandle,
    defaults: Defaults,
}

impl ResourceManager {
    pub fn new(repo: RepositoryHandle, defaults: Defaults) -> Self {
        Self { repo, defaults }
    }

    fn theme<'a>(&'a self, theme: Option<&'a str>) -> &'a str {
        theme.unwrap_or(&self.defaults.theme)
    }

    fn resource(name: &str, source: Source, options: Option<ResourceOptions>) -> Result<Resource> {
        let options = options.unwrap_or_else(|| ResourceOptions::defaults_for(&ResourceType::from_name(name)));
        Resource::new(name, source, options).or_raise(|| ErrorKind::InvalidResource(name.to_string()))
    }

    /// Register an external URL.
    pub async fn set_link(
        &self,
        theme: Option<&str>,
        name: &str,
        source: impl Into<String>,
        options: Option<ResourceOptions>,
    ) -> Result<Resource> {
        let resource = Self::resource(name, Source::Link { source: source.into() }, options)?;
        self.register(theme, &resource).await?;
        Ok(resource)
    }

    /// Register a literal body.
    pub async fn set_inline(
        &self,
        theme: Option<&str>,
        name: &str,
        body: impl Into<String>,
        options: Option<ResourceOptions>,
    ) -> Result<Resource> {
        let resource = Self::resource(name, Source::Inline { body: body.into() }, options)?;
        self.register(theme, &resource).await?;
        Ok(resource)
    }

    /// Register a built artifact reachable at `path`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use themer_build::ResourceManager;
    /// use themer_config::Defaults;
    /// use themer_storage::{ResourceType, backend::MockRepository};
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///
    /// let manager = ResourceManager::new(Arc::new(MockRepository::default()), Defaults::default());
    /// let resource = manager.set_file(Some("t1"), "app.css", "%host%/css/app.css", 512, None, None).await?;
    /// assert_eq!(resource.resource_type(), ResourceType::Css);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn set_file(
        &self,
        theme: Option<&str>,
        name: &str,
        path: impl Into<String>,
        size: u64,
        version: Option<String>,
        options: Option<ResourceOptions>,
    ) -> Result<Resource> {
        let resource = Self::resource(name, Source::File { path: path.into(), size, version }, options)?;
        self.register(theme, &resource).await?;
        Ok(resource)
    }

    /// Store an already constructed resource. Returns `false` when the
    /// stored record was identical and nothing was written.
    #[instrument(skip_all, fields(name = %resource.name))]
    pub async fn register(&self, theme: Option<&str>, resource: &Resource) -> Result<bool> {
        let theme = self.theme(theme);
        tracing::debug!(theme, kind = resource.source.kind(), "Registering resource");
        self.store(theme, Record::Resource(resource.clone())).await
    }

    pub async fn set_preset(
        &self,
        theme: Option<&str>,
        name: &str,
        items: impl IntoIterator<Item = impl Into<String>>,
        appendable: bool,
    ) -> Result<Preset> {
        let preset = Preset { name: name.to_string(), items: items.into_iter().map(Into::into).collect(), appendable };
        self.register_preset(theme, &preset).await?;
        Ok(preset)
    }

    /// Store a preset. Returns `false` when the stored record was identical.
    #[instrument(skip_all, fields(name = %preset.name))]
    pub async fn register_preset(&self, theme: Option<&str>, preset: &Preset) -> Result<bool> {
        let theme = self.theme(theme);
        tracing::debug!(theme, items = preset.items.len(), appendable = preset.appendable, "Registering preset");
        self.store(theme, Record::Preset(preset.clone())).await
    }

    async fn store(&self, theme: &str, record: Record) -> Result<bool> {
        let name = record.name();
        let stored = self.repo.get(theme, name).await.or_raise(|| ErrorKind::Storage)?;
        if stored.as_ref() == Some(&record) {
            tracing::debug!(theme, "Record unchanged");
            return Ok(false);
        }
        self.repo.put(theme, name, &record).await.or_raise(|| ErrorKind::Storage)?;
        Ok(true)
    }

    /// Whether a resource exists under `(theme, name)` with exactly this
    /// version. A missing record never matches.
    pub async fn compare_version(&self, theme: Option<&str>, name: &str, version: &str) -> Result<bool> {
        let stored = self.repo.resource(self.theme(theme), name).await.or_raise(|| ErrorKind::Storage)?;
        Ok(stored.is_some_and(|resource| resource.version() == Some(version)))
    }

    /// Administrative removal, never called by a build.
    pub async fn delete(&self, theme: Option<&str>, name: &str) -> Result<()> {
        self.repo.delete(self.theme(theme), name).await.or_raise(|| ErrorKind::Storage)
    }
}
