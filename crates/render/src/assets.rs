//! Resolved assets of one render, bucketed by type.

use themer_storage::{Placement, Resource, ResourceOptions, Source};

use crate::markup::{IconTags, ScriptTags, StylesheetTags};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stylesheet {
    pub name: String,
    pub source: Source,
    pub media: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub name: String,
    pub source: Source,
    pub is_async: bool,
    pub placement: Placement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub name: String,
    pub source: Source,
    pub rel: String,
    pub sizes: Option<String>,
}

/// Output of a resolver, in resolution order within each bucket.
///
/// A name appears at most once across all buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assets {
    host: String,
    stylesheets: Vec<Stylesheet>,
    scripts: Vec<Script>,
    icons: Vec<Icon>,
}

impl Assets {
    pub(crate) fn new(host: impl Into<String>) -> Self {
        Self { host: host.into(), ..Default::default() }
    }

    /// Bucket a stored resource by its type. Resources of other types are
    /// dropped and `false` is returned.
    pub(crate) fn push(&mut self, resource: Resource) -> bool {
        let Resource { name, source, options } = resource;
        match options {
            ResourceOptions::Css(options) => self.stylesheets.push(Stylesheet { name, source, media: options.media }),
            ResourceOptions::Js(options) => self.scripts.push(Script {
                name,
                source,
                is_async: options.is_async,
                placement: options.placement(),
            }),
            ResourceOptions::Icon(options) => {
                self.icons.push(Icon { name, source, rel: options.rel, sizes: options.sizes })
            },
            ResourceOptions::Other => return false,
        }
        true
    }

    pub(crate) fn push_inline_css(&mut self, name: String, body: String) {
        self.stylesheets.push(Stylesheet { name, source: Source::Inline { body }, media: None });
    }

    pub(crate) fn push_inline_js(&mut self, name: String, body: String, placement: Placement) {
        self.scripts.push(Script { name, source: Source::Inline { body }, is_async: false, placement });
    }

    /// Asset host substituted into file paths.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn stylesheets(&self) -> &[Stylesheet] {
        &self.stylesheets
    }

    pub fn scripts(&self) -> &[Script] {
        &self.scripts
    }

    pub fn icons(&self) -> &[Icon] {
        &self.icons
    }

    /// Every resolved name, stylesheets first, then scripts, then icons.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        let stylesheets = self.stylesheets.iter().map(|item| item.name.as_str());
        let scripts = self.scripts.iter().map(|item| item.name.as_str());
        stylesheets.chain(scripts).chain(self.icons.iter().map(|item| item.name.as_str()))
    }

    pub fn render_css(&self) -> String {
        StylesheetTags { host: &self.host, items: &self.stylesheets }.to_string()
    }

    pub fn render_js(&self, placement: Placement) -> String {
        ScriptTags { host: &self.host, items: &self.scripts, placement }.to_string()
    }

    pub fn render_icons(&self) -> String {
        IconTags { host: &self.host, items: &self.icons }.to_string()
    }

    /// Stylesheets, head scripts and icons.
    pub fn render_head(&self) -> String {
        let mut html = self.render_css();
        html.push_str(&self.render_js(Placement::Head));
        html.push_str(&self.render_icons());
        html
    }

    pub fn render_bottom(&self) -> String {
        self.render_js(Placement::Bottom)
    }
}
