//! Resource and preset records.
//!
//! A [`Record`] is what the repository stores under a `(theme, name)` key:
//! either a single [`Resource`] or a [`Preset`] listing resource names.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, Result};

/// Bucket a resource is rendered into, derived from its name suffix.
///
/// ```
/// use themer_storage::ResourceType;
///
/// assert_eq!(ResourceType::from_name("app.min.css"), ResourceType::Css);
/// assert_eq!(ResourceType::from_name("logo.svg"), ResourceType::Other("svg".into()));
/// ```
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash)]
pub enum ResourceType {
    #[display("css")]
    Css,
    #[display("js")]
    Js,
    #[display("icon")]
    Icon,
    #[display("{_0}")]
    Other(String),
}
impl ResourceType {
    /// Everything after the last `.` of `name`, or the whole name when there
    /// is no dot.
    pub fn from_name(name: &str) -> Self {
        let suffix = name.rsplit_once('.').map_or(name, |(_, suffix)| suffix);
        match suffix {
            "css" => Self::Css,
            "js" => Self::Js,
            "icon" => Self::Icon,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Where a script tag is emitted.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    #[display("head")]
    Head,
    #[default]
    #[display("bottom")]
    Bottom,
}
impl Placement {
    pub fn from_bottom(bottom: bool) -> Self {
        if bottom { Self::Bottom } else { Self::Head }
    }

    pub fn is_bottom(self) -> bool {
        self == Self::Bottom
    }
}

/// How the resource content is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Source {
    /// External URL, nothing is persisted besides the reference.
    Link { source: String },
    /// Literal body, emitted verbatim inside a `<style>`/`<script>` block.
    Inline { body: String },
    /// Built artifact. `path` may contain a `%host%` placeholder.
    File {
        path: String,
        size: u64,
        #[serde(default)]
        version: Option<String>,
    },
}
impl Source {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Link { .. } => "link",
            Self::Inline { .. } => "inline",
            Self::File { .. } => "file",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CssOptions {
    #[serde(default)]
    pub media: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsOptions {
    #[serde(rename = "async", default)]
    pub is_async: bool,
    #[serde(default = "JsOptions::default_bottom")]
    pub bottom: bool,
}
impl JsOptions {
    fn default_bottom() -> bool {
        true
    }

    pub fn placement(&self) -> Placement {
        Placement::from_bottom(self.bottom)
    }
}
impl Default for JsOptions {
    fn default() -> Self {
        Self { is_async: false, bottom: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconOptions {
    pub rel: String,
    #[serde(default)]
    pub sizes: Option<String>,
}
impl Default for IconOptions {
    fn default() -> Self {
        Self { rel: "icon".to_string(), sizes: None }
    }
}

/// Per-type options, tagged by the resource type they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResourceOptions {
    Css(CssOptions),
    Js(JsOptions),
    Icon(IconOptions),
    /// Stored but never rendered.
    Other,
}
impl ResourceOptions {
    /// Default options for a resource of the given type.
    pub fn defaults_for(resource_type: &ResourceType) -> Self {
        match resource_type {
            ResourceType::Css => Self::Css(CssOptions::default()),
            ResourceType::Js => Self::Js(JsOptions::default()),
            ResourceType::Icon => Self::Icon(IconOptions::default()),
            ResourceType::Other(_) => Self::Other,
        }
    }

    fn matches(&self, resource_type: &ResourceType) -> bool {
        matches!(
            (self, resource_type),
            (Self::Css(_), ResourceType::Css)
                | (Self::Js(_), ResourceType::Js)
                | (Self::Icon(_), ResourceType::Icon)
                | (Self::Other, ResourceType::Other(_))
        )
    }
}
impl From<CssOptions> for ResourceOptions {
    fn from(options: CssOptions) -> Self {
        Self::Css(options)
    }
}
impl From<JsOptions> for ResourceOptions {
    fn from(options: JsOptions) -> Self {
        Self::Js(options)
    }
}
impl From<IconOptions> for ResourceOptions {
    fn from(options: IconOptions) -> Self {
        Self::Icon(options)
    }
}

/// A single stylesheet, script or icon.
///
/// Constructed through [`Resource::new`] or [`Resource::with_defaults`] so
/// that the options always agree with the type derived from the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub source: Source,
    pub options: ResourceOptions,
}
impl Resource {
    /// Returns [`ErrorKind::InvalidResource`] when `options` belong to a
    /// different type than the one derived from `name`.
    pub fn new(name: impl Into<String>, source: Source, options: ResourceOptions) -> Result<Self> {
        let resource = Self { name: name.into(), source, options };
        resource.validate()?;
        Ok(resource)
    }

    /// Fill in the default options for the type derived from `name`.
    pub fn with_defaults(name: impl Into<String>, source: Source) -> Self {
        let name = name.into();
        let options = ResourceOptions::defaults_for(&ResourceType::from_name(&name));
        Self { name, source, options }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            exn::bail!(ErrorKind::InvalidResource("empty resource name".to_string()));
        }
        let resource_type = self.resource_type();
        if !self.options.matches(&resource_type) {
            exn::bail!(ErrorKind::InvalidResource(format!(
                "{} has type {resource_type} but carries other options",
                self.name
            )));
        }
        Ok(())
    }

    pub fn resource_type(&self) -> ResourceType {
        ResourceType::from_name(&self.name)
    }

    /// Content version, only ever present on file resources.
    pub fn version(&self) -> Option<&str> {
        match &self.source {
            Source::File { version, .. } => version.as_deref(),
            _ => None,
        }
    }
}

/// A named, ordered list of resource names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub items: Vec<String>,
    #[serde(default)]
    pub appendable: bool,
}

/// Anything stored under a `(theme, name)` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "lowercase")]
pub enum Record {
    Resource(Resource),
    Preset(Preset),
}
impl Record {
    pub fn name(&self) -> &str {
        match self {
            Self::Resource(resource) => &resource.name,
            Self::Preset(preset) => &preset.name,
        }
    }
}
impl From<Resource> for Record {
    fn from(resource: Resource) -> Self {
        Self::Resource(resource)
    }
}
impl From<Preset> for Record {
    fn from(preset: Preset) -> Self {
        Self::Preset(preset)
    }
}
