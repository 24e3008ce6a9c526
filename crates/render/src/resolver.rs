//! Per-render composition of presets and page requests.
//!
//! A [`Resolver`] first collects what a page asks for, then composes it
//! exactly once:
//!
//! 1. The first non-appendable requested preset is the base, the default
//!    preset when there is none. Further non-appendable presets are ignored.
//! 2. Items of the base, then of every appendable preset, then explicit
//!    stylesheet and script requests are added in order.
//! 3. A name is only ever loaded once; the first occurrence wins, even when
//!    its lookup missed.
//!
//! Lookup failures never fail a render: they are logged and the resource is
//! left out.

use exn::OptionExt;
use std::collections::HashSet;
use std::sync::Arc;
use themer_storage::{Placement, Preset};
use tracing::instrument;

use crate::assets::Assets;
use crate::distributor::ResourceDistributor;
use crate::error::{ErrorKind, Result};

/// One explicit stylesheet or script request.
#[derive(Debug, Clone)]
struct Request {
    name: String,
    /// Literal content, synthesized into an inline resource.
    body: Option<String>,
    placement: Placement,
}

#[derive(Debug, Default)]
struct Rules {
    css: Vec<Request>,
    js: Vec<Request>,
    presets: Vec<String>,
}
impl Rules {
    /// Replace a request for the same name in place, or append.
    fn upsert(requests: &mut Vec<Request>, request: Request) {
        match requests.iter_mut().find(|existing| existing.name == request.name) {
            Some(existing) => *existing = request,
            None => requests.push(request),
        }
    }
}

/// Request-scoped resource composition. Create one per render.
///
/// ```
/// use std::sync::Arc;
/// use themer_config::Defaults;
/// use themer_render::{Resolver, ResourceDistributor};
/// use themer_storage::{Placement, Preset, Record, Resource, Source, backend::MockRepository};
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
///
/// let nav = Resource::with_defaults("nav.css", Source::Link { source: "/nav.css".into() });
/// let preset = Preset { name: "default".into(), items: vec!["nav.css".into()], appendable: false };
/// let repo = MockRepository::with_records([("main", Record::from(nav)), ("main", Record::from(preset))]);
/// let distributor = Arc::new(ResourceDistributor::new(Arc::new(repo), Defaults::default(), Default::default()));
///
/// let mut resolver = Resolver::new(distributor);
/// resolver.add_js("boot.js", Some("boot();".into()), Placement::Head)?;
/// let head = resolver.render_head().await;
/// assert!(head.starts_with("<link rel=\"stylesheet\" type=\"text/css\" href=\"/nav.css\" />"));
/// assert!(head.contains("boot();"));
/// # Ok(())
/// # }
/// ```
pub struct Resolver {
    distributor: Arc<ResourceDistributor>,
    theme: Option<String>,
    /// Collected requests, `None` once resolved.
    rules: Option<Rules>,
    assets: Assets,
}

impl Resolver {
    pub fn new(distributor: Arc<ResourceDistributor>) -> Self {
        Self { distributor, theme: None, rules: Some(Rules::default()), assets: Assets::default() }
    }

    pub fn is_resolved(&self) -> bool {
        self.rules.is_none()
    }

    /// Selected theme, `None` for the default theme.
    pub fn theme(&self) -> Option<&str> {
        self.theme.as_deref()
    }

    fn rules(&mut self) -> Result<&mut Rules> {
        self.rules.as_mut().ok_or_raise(|| ErrorKind::AlreadyResolved)
    }

    pub fn select_theme(&mut self, theme: impl Into<String>) -> Result<()> {
        self.rules()?;
        self.theme = Some(theme.into());
        Ok(())
    }

    /// Request a stylesheet by name, or with literal content to be rendered
    /// inline.
    pub fn add_css(&mut self, name: impl Into<String>, body: Option<String>) -> Result<()> {
        let request = request(name.into(), body, Placement::Head)?;
        Rules::upsert(&mut self.rules()?.css, request);
        Ok(())
    }

    /// Request a script by name, or with literal content. `placement` only
    /// applies to literal content; registered scripts keep their own.
    pub fn add_js(&mut self, name: impl Into<String>, body: Option<String>, placement: Placement) -> Result<()> {
        let request = request(name.into(), body, placement)?;
        Rules::upsert(&mut self.rules()?.js, request);
        Ok(())
    }

    pub fn add_preset(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        let rules = self.rules()?;
        if !rules.presets.contains(&name) {
            rules.presets.push(name);
        }
        Ok(())
    }

    /// Compose the collected requests, once. Later calls return the same
    /// assets.
    pub async fn resolve(&mut self) -> &Assets {
        if let Some(rules) = self.rules.take() {
            self.assets = self.compose(rules).await;
        }
        &self.assets
    }

    pub async fn render_css(&mut self) -> String {
        self.resolve().await.render_css()
    }

    pub async fn render_js(&mut self, placement: Placement) -> String {
        self.resolve().await.render_js(placement)
    }

    pub async fn render_icons(&mut self) -> String {
        self.resolve().await.render_icons()
    }

    pub async fn render_head(&mut self) -> String {
        self.resolve().await.render_head()
    }

    pub async fn render_bottom(&mut self) -> String {
        self.resolve().await.render_bottom()
    }

    #[instrument(skip_all, fields(theme = ?self.theme))]
    async fn compose(&self, rules: Rules) -> Assets {
        let theme = self.theme.as_deref();
        let mut assets = Assets::new(self.distributor.host(theme));
        let mut loaded = HashSet::new();

        let mut base = None;
        let mut extras = Vec::new();
        for name in &rules.presets {
            match self.preset(Some(name.as_str())).await {
                None => {}
                Some(preset) if preset.appendable => extras.push(preset),
                Some(preset) if base.is_none() => base = Some(preset),
                Some(preset) => tracing::debug!(preset = %preset.name, "Ignoring additional base preset"),
            }
        }
        if base.is_none() {
            base = self.preset(None).await;
        }
        for preset in base.iter().chain(&extras) {
            for name in &preset.items {
                if loaded.insert(name.clone()) {
                    self.load(name, &mut assets).await;
                }
            }
        }

        for request in rules.css {
            if !loaded.insert(request.name.clone()) {
                continue;
            }
            match request.body {
                Some(body) => assets.push_inline_css(request.name, body),
                None => self.load(&request.name, &mut assets).await,
            }
        }
        for request in rules.js {
            if !loaded.insert(request.name.clone()) {
                continue;
            }
            match request.body {
                Some(body) => assets.push_inline_js(request.name, body, request.placement),
                None => self.load(&request.name, &mut assets).await,
            }
        }
        tracing::debug!(
            stylesheets = assets.stylesheets().len(),
            scripts = assets.scripts().len(),
            icons = assets.icons().len(),
            "Resources resolved"
        );
        assets
    }

    async fn preset(&self, name: Option<&str>) -> Option<Preset> {
        let lookup = self.distributor.preset(name, self.theme.as_deref()).await;
        soft(lookup, name.unwrap_or(&self.distributor.defaults().preset))
    }

    async fn load(&self, name: &str, assets: &mut Assets) {
        let lookup = self.distributor.resource(name, self.theme.as_deref()).await;
        if let Some(resource) = soft(lookup, name)
            && !assets.push(resource)
        {
            tracing::debug!(name, "Dropping resource of a type that is never rendered");
        }
    }
}

fn request(name: String, body: Option<String>, placement: Placement) -> Result<Request> {
    if name.is_empty() {
        exn::bail!(ErrorKind::InvalidResource("empty resource name".to_string()));
    }
    Ok(Request { name, body, placement })
}

/// Turn a failed lookup into a miss.
fn soft<T>(lookup: Result<Option<T>>, name: &str) -> Option<T> {
    lookup.unwrap_or_else(|e| {
        tracing::warn!(name, error = ?e, "Lookup failed, leaving it out");
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use themer_config::Defaults;
    use themer_storage::backend::{MockRepository, ResourceRepository};
    use themer_storage::{CssOptions, IconOptions, JsOptions, Record, Resource, Source};

    fn file(name: &str, path: &str) -> Resource {
        Resource::with_defaults(name, Source::File { path: path.to_string(), size: 10, version: None })
    }

    fn preset(name: &str, items: &[&str], appendable: bool) -> Preset {
        Preset { name: name.to_string(), items: items.iter().map(|item| item.to_string()).collect(), appendable }
    }

    fn resolver(theme: &str, records: Vec<Record>) -> Resolver {
        let repo = MockRepository::with_records(records.into_iter().map(|record| (theme, record)));
        let hosts = HashMap::from([("t1".to_string(), "https://cdn.example.com".to_string())]);
        let defaults = Defaults { theme: "t1".to_string(), preset: "default".to_string() };
        Resolver::new(Arc::new(ResourceDistributor::new(Arc::new(repo), defaults, hosts)))
    }

    #[tokio::test]
    async fn test_default_preset_end_to_end() {
        let mut resolver = resolver(
            "t1",
            vec![
                file("nav.css", "%host%/css/nav.css").into(),
                file("app.js", "%host%/js/app.js").into(),
                preset("default", &["nav.css", "app.js"], false).into(),
            ],
        );
        resolver.select_theme("t1").unwrap();

        let head = resolver.render_head().await;
        assert_eq!(head, "<link rel=\"stylesheet\" type=\"text/css\" href=\"https://cdn.example.com/css/nav.css\" />");
        assert!(!head.contains("app.js"));

        let bottom = resolver.render_bottom().await;
        assert_eq!(bottom, "<script type=\"text/javascript\" src=\"https://cdn.example.com/js/app.js\"></script>");
        assert!(!bottom.contains("nav.css"));
    }

    #[tokio::test]
    async fn test_preset_precedence() {
        let mut resolver = resolver(
            "t1",
            vec![
                file("a.css", "/a.css").into(),
                file("b.css", "/b.css").into(),
                file("c.css", "/c.css").into(),
                file("d.css", "/d.css").into(),
                preset("default", &["d.css"], false).into(),
                preset("page", &["a.css", "b.css"], false).into(),
                preset("extra", &["b.css", "c.css"], true).into(),
                preset("other", &["d.css"], false).into(),
            ],
        );
        resolver.add_preset("extra").unwrap();
        resolver.add_preset("page").unwrap();
        resolver.add_preset("other").unwrap();

        let assets = resolver.resolve().await;
        assert_eq!(assets.names().collect::<Vec<_>>(), ["a.css", "b.css", "c.css"]);
    }

    #[tokio::test]
    async fn test_appendable_only_keeps_default_base() {
        let mut resolver = resolver(
            "t1",
            vec![
                file("base.css", "/base.css").into(),
                file("extra.css", "/extra.css").into(),
                preset("default", &["base.css"], false).into(),
                preset("extra", &["extra.css", "base.css"], true).into(),
            ],
        );
        resolver.add_preset("extra").unwrap();
        resolver.add_preset("missing").unwrap();
        let assets = resolver.resolve().await;
        assert_eq!(assets.names().collect::<Vec<_>>(), ["base.css", "extra.css"]);
    }

    #[tokio::test]
    async fn test_first_writer_wins() {
        let mut resolver = resolver(
            "t1",
            vec![file("app.css", "/stored.css").into(), preset("default", &["app.css", "missing.css"], false).into()],
        );
        resolver.add_css("app.css", Some("override{}".to_string())).unwrap();
        resolver.add_css("missing.css", Some("late{}".to_string())).unwrap();

        let assets = resolver.resolve().await;
        assert_eq!(assets.stylesheets().len(), 1);
        assert_eq!(assets.render_css(), "<link rel=\"stylesheet\" type=\"text/css\" href=\"/stored.css\" />");
    }

    #[tokio::test]
    async fn test_explicit_requests() {
        let mut resolver = resolver(
            "t1",
            vec![
                Resource::new(
                    "print.css",
                    Source::Link { source: "/print.css".to_string() },
                    CssOptions { media: Some("print".to_string()) }.into(),
                )
                .unwrap()
                .into(),
                Resource::new(
                    "head.js",
                    Source::Link { source: "/head.js".to_string() },
                    JsOptions { is_async: true, bottom: false }.into(),
                )
                .unwrap()
                .into(),
            ],
        );
        resolver.add_css("critical", Some("a{}".to_string())).unwrap();
        resolver.add_css("print.css", None).unwrap();
        resolver.add_js("head.js", None, Placement::Bottom).unwrap();
        resolver.add_js("late", Some("late();".to_string()), Placement::Bottom).unwrap();

        assert_eq!(
            resolver.render_css().await,
            "<link rel=\"stylesheet\" type=\"text/css\" media=\"print\" href=\"/print.css\" /><style>a{}</style>"
        );
        assert_eq!(
            resolver.render_js(Placement::Head).await,
            "<script type=\"text/javascript\" async src=\"/head.js\"></script>"
        );
        assert_eq!(
            resolver.render_js(Placement::Bottom).await,
            "<script type=\"text/javascript\">/*<![CDATA[*/late();/*]]>*/</script>"
        );
    }

    #[tokio::test]
    async fn test_readding_replaces_in_place() {
        let mut resolver = resolver("t1", vec![]);
        resolver.add_css("a", Some("a{}".to_string())).unwrap();
        resolver.add_css("b", Some("b{}".to_string())).unwrap();
        resolver.add_css("a", Some("A{}".to_string())).unwrap();
        assert_eq!(resolver.render_css().await, "<style>A{}b{}</style>");
    }

    #[tokio::test]
    async fn test_requests_after_resolution_fail() {
        let mut resolver = resolver("t1", vec![]);
        resolver.add_preset("default").unwrap();
        assert!(!resolver.is_resolved());
        assert_eq!(resolver.render_head().await, "");
        assert!(resolver.is_resolved());

        let err = resolver.add_css("late.css", None).unwrap_err();
        assert!(matches!(&*err, ErrorKind::AlreadyResolved));
        let err = resolver.select_theme("t2").unwrap_err();
        assert!(matches!(&*err, ErrorKind::AlreadyResolved));
        assert!(matches!(&*resolver.add_preset("x").unwrap_err(), ErrorKind::AlreadyResolved));
    }

    #[tokio::test]
    async fn test_resolve_composes_once() {
        let repo = Arc::new(MockRepository::with_records([
            ("t1", Record::from(file("nav.css", "/nav.css"))),
            ("t1", Record::from(preset("default", &["nav.css"], false))),
        ]));
        let defaults = Defaults { theme: "t1".to_string(), preset: "default".to_string() };
        let distributor = ResourceDistributor::new(repo.clone(), defaults, HashMap::new());
        let mut resolver = Resolver::new(Arc::new(distributor));

        let first = resolver.resolve().await.clone();
        let reads = repo.reads();
        assert_eq!(first.names().collect::<Vec<_>>(), ["nav.css"]);
        assert_eq!(resolver.resolve().await, &first);
        assert_eq!(resolver.render_css().await, "<link rel=\"stylesheet\" type=\"text/css\" href=\"/nav.css\" />");
        assert_eq!(repo.reads(), reads);
    }

    #[tokio::test]
    async fn test_icons_and_other_types() {
        let mut resolver = resolver(
            "t1",
            vec![
                Resource::new(
                    "touch.icon",
                    Source::File { path: "%host%/touch.png".to_string(), size: 1, version: None },
                    IconOptions { rel: "apple-touch-icon".to_string(), sizes: Some("180x180".to_string()) }
                        .into(),
                )
                .unwrap()
                .into(),
                file("logo.png", "/logo.png").into(),
                preset("default", &["touch.icon", "logo.png"], false).into(),
            ],
        );
        assert_eq!(
            resolver.render_icons().await,
            "<link rel=\"apple-touch-icon\" sizes=\"180x180\" href=\"https://cdn.example.com/touch.png\" />"
        );
        assert_eq!(resolver.resolve().await.names().count(), 1);
    }

    #[tokio::test]
    async fn test_selected_theme() {
        let records = || -> Vec<Record> {
            vec![file("nav.css", "%host%/nav.css").into(), preset("default", &["nav.css"], false).into()]
        };
        let mut unselected = resolver("t2", records());
        assert_eq!(unselected.theme(), None);
        assert_eq!(unselected.render_css().await, "");

        let mut selected = resolver("t2", records());
        selected.select_theme("t2").unwrap();
        assert_eq!(selected.render_css().await, "<link rel=\"stylesheet\" type=\"text/css\" href=\"/nav.css\" />");
    }

    struct FailingRepository;

    #[async_trait]
    impl ResourceRepository for FailingRepository {
        fn name(&self) -> &str {
            "failing"
        }

        async fn get(&self, _theme: &str, _name: &str) -> themer_storage::error::Result<Option<Record>> {
            exn::bail!(themer_storage::error::ErrorKind::Network)
        }

        async fn put(&self, _theme: &str, _name: &str, _record: &Record) -> themer_storage::error::Result<()> {
            exn::bail!(themer_storage::error::ErrorKind::Network)
        }

        async fn delete(&self, _theme: &str, _name: &str) -> themer_storage::error::Result<()> {
            exn::bail!(themer_storage::error::ErrorKind::Network)
        }
    }

    #[tokio::test]
    async fn test_storage_failures_are_soft_misses() {
        let distributor = ResourceDistributor::new(Arc::new(FailingRepository), Defaults::default(), HashMap::new());
        let mut resolver = Resolver::new(Arc::new(distributor));
        resolver.add_preset("default").unwrap();
        resolver.add_css("app.css", None).unwrap();
        resolver.add_js("inline", Some("ok();".to_string()), Placement::Bottom).unwrap();

        assert_eq!(resolver.render_css().await, "");
        assert_eq!(
            resolver.render_bottom().await,
            "<script type=\"text/javascript\">/*<![CDATA[*/ok();/*]]>*/</script>"
        );
    }
}
