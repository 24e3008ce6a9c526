//! Builds the assets of a theme definition and registers them.
//!
//! Everything is written or copied first and registered last, so a
//! configuration error found half-way leaves the registry untouched. There is
//! no transaction across registrations: a storage failure keeps whatever was
//! registered before it, and re-running the build is the recovery.

use exn::{OptionExt, ResultExt};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use themer_storage::{CssOptions, IconOptions, JsOptions, Preset, Resource, ResourceOptions, Source};
use tracing::instrument;

use crate::definition::{IconItem, IconKind, ImagePack, ItemKind, ScriptItem, StylesheetItem, ThemeDefinition};
use crate::error::{ErrorKind, Result};
use crate::filter::{CssMinifier, FilterRegistry, JsMinifier, Minifier};
use crate::manager::ResourceManager;
use crate::version::{VERSION_PLACEHOLDER, version_token};

/// Placeholder replaced by the builder's project root in `root` and sources.
pub const ROOT_PLACEHOLDER: &str = "%root_dir%";
/// Placeholder replaced by an artifact's path in the public path pattern.
pub const RESOURCE_PLACEHOLDER: &str = "%resource%";

/// What a build run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Stylesheet and script artifacts written to disk.
    pub written: usize,
    /// Icons and images copied because their contents changed.
    pub copied: usize,
    /// Artifacts, icons and images left as they were on disk.
    pub kept: usize,
    /// Resources stored because they were new or changed.
    pub registered: usize,
    /// Resources whose stored version or record already matched.
    pub unchanged: usize,
    /// Presets stored because they were new or changed.
    pub presets: usize,
}

/// Paths shared by every item of one theme.
struct Layout {
    root: PathBuf,
    pack_dir: PathBuf,
    pack_prefix: String,
    pattern: String,
}
impl Layout {
    fn new(root_dir: &Path, definition: &ThemeDefinition) -> Self {
        let root = PathBuf::from(expand_root(root_dir, &definition.root));
        let (pack_dir, pack_prefix) = match definition.pack.as_deref().filter(|pack| !pack.is_empty()) {
            Some(pack) => (root.join(pack), format!("{pack}/")),
            None => (root.clone(), String::new()),
        };
        Self { root, pack_dir, pack_prefix, pattern: definition.pattern.clone() }
    }

    /// Public path of an artifact stored at `relative` under the theme root.
    fn public(&self, relative: &str) -> String {
        self.pattern.replace(RESOURCE_PLACEHOLDER, relative)
    }

    /// Public path of an artifact stored at `path` under the packed
    /// `section` directory.
    fn public_packed(&self, section: &str, path: &str) -> String {
        self.public(&format!("{}{section}/{path}", self.pack_prefix))
    }
}

fn expand_root(root_dir: &Path, template: &str) -> String {
    template.replace(ROOT_PLACEHOLDER, &root_dir.to_string_lossy())
}

/// A stylesheet or script once its body is built.
struct Bundle<'a> {
    name: &'a str,
    kind: ItemKind,
    path: Option<&'a str>,
    versioned: bool,
    section: &'static str,
    options: ResourceOptions,
}

/// Builds, versions, copies and registers theme assets.
///
/// ```no_run
/// use themer_build::{Builder, ResourceManager, ThemeSet};
/// use themer_config::Config;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
///
/// let config = Config::load(None)?;
/// let repo = themer_storage::connect(&config.storage).await?;
/// let builder = Builder::new(ResourceManager::new(repo, config.resource.defaults()), "/srv/app");
/// let themes = ThemeSet::load("/srv/app/config/themes.toml")?;
/// for (theme, report) in builder.build_all(&themes.themes).await? {
///     println!("{theme}: {} written, {} registered", report.written, report.registered);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Builder {
    manager: ResourceManager,
    css_filters: FilterRegistry,
    js_filters: FilterRegistry,
    css_minifier: Box<dyn Minifier>,
    js_minifier: Box<dyn Minifier>,
    root_dir: PathBuf,
}

impl Builder {
    /// `root_dir` replaces `%root_dir%` in definitions.
    pub fn new(manager: ResourceManager, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            manager,
            css_filters: FilterRegistry::stylesheets(),
            js_filters: FilterRegistry::scripts(),
            css_minifier: Box::new(CssMinifier),
            js_minifier: Box::new(JsMinifier),
            root_dir: root_dir.into(),
        }
    }

    pub fn with_filters(mut self, stylesheets: FilterRegistry, scripts: FilterRegistry) -> Self {
        self.css_filters = stylesheets;
        self.js_filters = scripts;
        self
    }

    pub fn with_minifiers(mut self, css: impl Minifier + 'static, js: impl Minifier + 'static) -> Self {
        self.css_minifier = Box::new(css);
        self.js_minifier = Box::new(js);
        self
    }

    /// Build several themes in order, stopping at the first that fails.
    pub async fn build_all<'a>(
        &self,
        definitions: impl IntoIterator<Item = &'a ThemeDefinition>,
    ) -> Result<Vec<(String, BuildReport)>> {
        let mut reports = Vec::new();
        for definition in definitions {
            reports.push((definition.name.clone(), self.build(definition).await?));
        }
        Ok(reports)
    }

    #[instrument(skip_all, fields(theme = %definition.name))]
    pub async fn build(&self, definition: &ThemeDefinition) -> Result<BuildReport> {
        let theme = definition.name.as_str();
        let layout = Layout::new(&self.root_dir, definition);
        let mut report = BuildReport::default();
        let mut resources = Vec::new();

        for item in &definition.stylesheets {
            resources.extend(self.stylesheet(theme, &layout, item, &mut report).await?);
        }
        tracing::debug!(count = definition.stylesheets.len(), "Stylesheets built");
        for item in &definition.javascripts {
            resources.extend(self.script(theme, &layout, item, &mut report).await?);
        }
        tracing::debug!(count = definition.javascripts.len(), "Scripts built");
        for item in &definition.icons {
            resources.push(self.icon(&layout, item, &mut report).await?);
        }
        for pack in &definition.images {
            self.images(&layout, pack, &mut report).await?;
        }

        for resource in &resources {
            if self.manager.register(Some(theme), resource).await? {
                report.registered += 1;
            } else {
                report.unchanged += 1;
            }
        }
        for item in &definition.presets {
            let preset = Preset { name: item.name.clone(), items: item.items.clone(), appendable: item.appendable };
            if self.manager.register_preset(Some(theme), &preset).await? {
                report.presets += 1;
            }
        }
        tracing::info!(
            written = report.written,
            copied = report.copied,
            registered = report.registered,
            unchanged = report.unchanged,
            presets = report.presets,
            "Theme built"
        );
        Ok(report)
    }

    async fn stylesheet(
        &self,
        theme: &str,
        layout: &Layout,
        item: &StylesheetItem,
        report: &mut BuildReport,
    ) -> Result<Option<Resource>> {
        let options = ResourceOptions::Css(CssOptions { media: item.media.clone() });
        if item.kind == ItemKind::Link {
            return link(&item.name, &item.src, options).map(Some);
        }
        let mut body = String::new();
        for src in self.sources(&item.name, &item.src)? {
            body.push_str(&filtered(&self.css_filters, &item.name, item.filter.as_deref(), &src).await?);
        }
        if item.compress {
            let minified = self.css_minifier.minify(&body).or_raise(|| ErrorKind::Filter(item.name.clone()))?;
            body = minified.replace('}', "}\n");
        }
        let bundle = Bundle {
            name: &item.name,
            kind: item.kind,
            path: item.path.as_deref(),
            versioned: item.version,
            section: "css",
            options,
        };
        self.finish(theme, layout, bundle, body, report).await
    }

    async fn script(
        &self,
        theme: &str,
        layout: &Layout,
        item: &ScriptItem,
        report: &mut BuildReport,
    ) -> Result<Option<Resource>> {
        let options = ResourceOptions::Js(JsOptions { is_async: item.is_async, bottom: item.bottom });
        if item.kind == ItemKind::Link {
            return link(&item.name, &item.src, options).map(Some);
        }
        let mut parts = Vec::with_capacity(item.src.len());
        for src in self.sources(&item.name, &item.src)? {
            let part = filtered(&self.js_filters, &item.name, item.filter.as_deref(), &src).await?;
            let part = part.trim();
            parts.push(if item.compress {
                self.js_minifier.minify(part).or_raise(|| ErrorKind::Filter(item.name.clone()))?
            } else {
                part.to_string()
            });
        }
        let bundle = Bundle {
            name: &item.name,
            kind: item.kind,
            path: item.path.as_deref(),
            versioned: item.version,
            section: "js",
            options,
        };
        self.finish(theme, layout, bundle, parts.join("\n"), report).await
    }

    fn sources(&self, name: &str, src: &[String]) -> Result<Vec<PathBuf>> {
        if src.is_empty() {
            exn::bail!(ErrorKind::InvalidItem(name.to_string(), "no sources listed".to_string()));
        }
        Ok(src.iter().map(|src| PathBuf::from(expand_root(&self.root_dir, src))).collect())
    }

    /// Turn a built body into an inline resource, or into a file artifact
    /// and its resource when the stored version differs.
    async fn finish(
        &self,
        theme: &str,
        layout: &Layout,
        bundle: Bundle<'_>,
        body: String,
        report: &mut BuildReport,
    ) -> Result<Option<Resource>> {
        if bundle.kind == ItemKind::Inline {
            return new_resource(bundle.name, Source::Inline { body }, bundle.options).map(Some);
        }
        let template = bundle
            .path
            .ok_or_raise(|| ErrorKind::InvalidItem(bundle.name.to_string(), "file items need a path".to_string()))?;
        let version = bundle.versioned.then(|| version_token(body.as_bytes()));
        let path = match &version {
            Some(version) => template.replace(VERSION_PLACEHOLDER, version),
            None => template.to_string(),
        };
        let destination = layout.pack_dir.join(bundle.section).join(&path);

        // An existing versioned file already holds exactly this body.
        if version.is_none() || !exists(&destination).await? {
            write_artifact(&destination, body.as_bytes()).await?;
            tracing::debug!(name = bundle.name, path = %destination.display(), "Artifact written");
            report.written += 1;
        } else {
            report.kept += 1;
        }

        if let Some(version) = &version
            && self.manager.compare_version(Some(theme), bundle.name, version).await?
        {
            tracing::info!(name = bundle.name, version, "Resource not modified, skipping registration");
            report.unchanged += 1;
            return Ok(None);
        }
        let path = layout.public_packed(bundle.section, &path);
        let source = Source::File { path, size: body.len() as u64, version };
        new_resource(bundle.name, source, bundle.options).map(Some)
    }

    async fn icon(&self, layout: &Layout, item: &IconItem, report: &mut BuildReport) -> Result<Resource> {
        let src = PathBuf::from(expand_root(&self.root_dir, &item.src));
        let contents = read_source(&src).await?;
        let destination = layout.root.join(&item.path);
        if copy_if_changed(&contents, &destination).await? {
            report.copied += 1;
        } else {
            report.kept += 1;
        }
        let sizes = match item.kind {
            IconKind::AppleTouchIcon => item.sizes.clone(),
            IconKind::Favicon => None,
        };
        let options = IconOptions { rel: item.kind.rel().to_string(), sizes };
        let size = contents.trim_ascii().len() as u64;
        let source = Source::File { path: layout.public(&item.path), size, version: None };
        new_resource(&item.name, source, options.into())
    }

    async fn images(&self, layout: &Layout, pack: &ImagePack, report: &mut BuildReport) -> Result<()> {
        let src_dir = PathBuf::from(expand_root(&self.root_dir, &pack.src));
        let dest_dir = layout.pack_dir.join(&pack.path);
        for image in &pack.images {
            let contents = read_source(&src_dir.join(image)).await?;
            if copy_if_changed(&contents, &dest_dir.join(image)).await? {
                report.copied += 1;
            } else {
                report.kept += 1;
            }
        }
        tracing::debug!(pack = %pack.name, count = pack.images.len(), "Images copied");
        Ok(())
    }
}

/// Read one source and run it through the item's filter, looked up in the
/// registry for the item's kind.
async fn filtered(filters: &FilterRegistry, name: &str, filter: Option<&str>, src: &Path) -> Result<String> {
    let filter_name = filter.ok_or_raise(|| ErrorKind::InvalidItem(name.to_string(), "no filter".to_string()))?;
    let Some(filter) = filters.get(filter_name) else {
        exn::bail!(ErrorKind::UnsupportedFilter { item: name.to_string(), filter: filter_name.to_string() });
    };
    let contents = read_source(src).await?;
    let contents = String::from_utf8(contents).or_raise(|| ErrorKind::Filter(name.to_string()))?;
    filter.apply(src, &contents).or_raise(|| ErrorKind::Filter(name.to_string()))
}

fn link(name: &str, src: &[String], options: ResourceOptions) -> Result<Resource> {
    let source =
        src.first().ok_or_raise(|| ErrorKind::InvalidItem(name.to_string(), "link items need a source".to_string()))?;
    new_resource(name, Source::Link { source: source.clone() }, options)
}

fn new_resource(name: &str, source: Source, options: ResourceOptions) -> Result<Resource> {
    Resource::new(name, source, options).or_raise(|| ErrorKind::InvalidResource(name.to_string()))
}

async fn read_source(path: &Path) -> Result<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == IoErrorKind::NotFound => exn::bail!(ErrorKind::MissingSource(path.to_path_buf())),
        Err(e) => Err(e).or_raise(|| ErrorKind::Io(path.to_path_buf())),
    }
}

async fn exists(path: &Path) -> Result<bool> {
    tokio::fs::try_exists(path).await.or_raise(|| ErrorKind::Io(path.to_path_buf()))
}

async fn write_artifact(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Io(parent.to_path_buf()))?;
    }
    tokio::fs::write(path, contents).await.or_raise(|| ErrorKind::Io(path.to_path_buf()))
}

/// Copy-only assets compare trimmed contents instead of a version.
async fn copy_if_changed(contents: &[u8], destination: &Path) -> Result<bool> {
    if exists(destination).await? {
        let current = tokio::fs::read(destination).await.or_raise(|| ErrorKind::Io(destination.to_path_buf()))?;
        if current.trim_ascii() == contents.trim_ascii() {
            return Ok(false);
        }
    }
    write_artifact(destination, contents).await?;
    tracing::debug!(path = %destination.display(), "Copied");
    Ok(true)
}
