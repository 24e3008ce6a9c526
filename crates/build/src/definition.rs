//! Theme definitions, as read from TOML, YAML or JSON files.
//!
//! A definition is an immutable snapshot for one build run. Unknown item
//! types are rejected while loading, before anything is built.

use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Format, Json, Toml, Yaml};
use serde::Deserialize;
use std::path::Path;

use crate::error::{ErrorKind, Result};

/// How a stylesheet or script is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Registered as-is with its first source as URL.
    Link,
    /// Built body stored verbatim in the record.
    Inline,
    /// Built body written to disk, the record keeps the public path.
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StylesheetItem {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default)]
    pub filter: Option<String>,
    /// Destination relative to the stylesheet directory, may contain
    /// `%version%`.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub src: Vec<String>,
    #[serde(default)]
    pub compress: bool,
    #[serde(default)]
    pub media: Option<String>,
    #[serde(default)]
    pub version: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScriptItem {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub src: Vec<String>,
    #[serde(default)]
    pub compress: bool,
    #[serde(default = "ScriptItem::default_bottom")]
    pub bottom: bool,
    #[serde(rename = "async", default)]
    pub is_async: bool,
    #[serde(default)]
    pub version: bool,
}
impl ScriptItem {
    fn default_bottom() -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconKind {
    Favicon,
    AppleTouchIcon,
}
impl IconKind {
    /// Value of the `rel` attribute the icon is rendered with.
    pub fn rel(self) -> &'static str {
        match self {
            Self::Favicon => "shortcut icon",
            Self::AppleTouchIcon => "apple-touch-icon",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IconItem {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: IconKind,
    /// Only rendered for apple touch icons.
    #[serde(default)]
    pub sizes: Option<String>,
    /// Destination relative to the theme root.
    pub path: String,
    pub src: String,
}

/// Images copied verbatim, never registered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImagePack {
    pub name: String,
    pub src: String,
    pub path: String,
    #[serde(alias = "image", default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PresetItem {
    pub name: String,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub appendable: bool,
}

/// Everything needed to build and register the assets of one theme.
///
/// `root` and every source path may contain `%root_dir%`, replaced by the
/// project root handed to the [`Builder`](crate::Builder).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThemeDefinition {
    pub name: String,
    pub root: String,
    #[serde(default)]
    pub pack: Option<String>,
    /// Public path template, `%resource%` is replaced by the path of each
    /// artifact relative to the theme root.
    pub pattern: String,
    #[serde(default)]
    pub stylesheets: Vec<StylesheetItem>,
    #[serde(default)]
    pub javascripts: Vec<ScriptItem>,
    #[serde(default)]
    pub icons: Vec<IconItem>,
    #[serde(default)]
    pub images: Vec<ImagePack>,
    #[serde(default)]
    pub presets: Vec<PresetItem>,
}
impl ThemeDefinition {
    /// Load a single theme from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        figment_for(path).extract().or_raise(|| ErrorKind::Definition(path.to_path_buf()))
    }
}

/// Several themes read from one file under a `themes` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThemeSet {
    pub themes: Vec<ThemeDefinition>,
}
impl ThemeSet {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        figment_for(path).extract().or_raise(|| ErrorKind::Definition(path.to_path_buf()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.themes.iter().map(|theme| theme.name.as_str())
    }

    pub fn get(&self, name: &str) -> Result<&ThemeDefinition> {
        self.themes.iter().find(|theme| theme.name == name).ok_or_raise(|| ErrorKind::UnknownTheme(name.to_string()))
    }
}

fn figment_for(path: &Path) -> Figment {
    tracing::debug!(path = %path.display(), "Reading theme definition");
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => Figment::from(Yaml::file_exact(path)),
        Some("json") => Figment::from(Json::file_exact(path)),
        _ => Figment::from(Toml::file_exact(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THEMES: &str = r#"
        [[themes]]
        name = "main"
        root = "%root_dir%/public/themes/main"
        pack = "v1"
        pattern = "%host%/themes/main/%resource%"

        [[themes.stylesheets]]
        name = "app.css"
        type = "file"
        filter = "css"
        path = "app-%version%.css"
        src = ["%root_dir%/assets/app.css"]
        compress = true
        version = true

        [[themes.javascripts]]
        name = "analytics.js"
        type = "link"
        src = ["https://analytics.example.com/a.js"]
        async = true
        bottom = false

        [[themes.icons]]
        name = "touch.icon"
        type = "apple-touch-icon"
        sizes = "180x180"
        path = "touch.png"
        src = "%root_dir%/assets/touch.png"

        [[themes.images]]
        name = "sprites"
        src = "%root_dir%/assets/img"
        path = "img"
        image = ["logo.png"]

        [[themes.presets]]
        name = "default"
        items = ["app.css", "analytics.js"]

        [[themes]]
        name = "admin"
        root = "/srv/admin"
        pattern = "/%resource%"
    "#;

    fn write(dir: &Path, file: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(file);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_theme_set() {
        let dir = tempfile::tempdir().unwrap();
        let set = ThemeSet::load(write(dir.path(), "themes.toml", THEMES)).unwrap();
        assert_eq!(set.names().collect::<Vec<_>>(), ["main", "admin"]);

        let main = set.get("main").unwrap();
        assert_eq!(main.pack.as_deref(), Some("v1"));
        assert_eq!(main.stylesheets[0].kind, ItemKind::File);
        assert!(main.stylesheets[0].version);
        assert_eq!(main.javascripts[0].kind, ItemKind::Link);
        assert!(main.javascripts[0].is_async);
        assert!(!main.javascripts[0].bottom);
        assert_eq!(main.icons[0].kind.rel(), "apple-touch-icon");
        assert_eq!(main.images[0].images, ["logo.png"]);
        assert!(!main.presets[0].appendable);

        let admin = set.get("admin").unwrap();
        assert!(admin.stylesheets.is_empty());
        assert_eq!(admin.pack, None);
    }

    #[test]
    fn test_unknown_theme() {
        let dir = tempfile::tempdir().unwrap();
        let set = ThemeSet::load(write(dir.path(), "themes.toml", THEMES)).unwrap();
        let err = set.get("missing").unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownTheme(name) if name == "missing"));
    }

    #[test]
    fn test_script_defaults_to_bottom() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = concat!(
            "name: t1\nroot: /srv\npattern: /%resource%\n",
            "javascripts:\n  - name: app.js\n    type: inline\n    filter: js\n    src: [app.js]\n",
        );
        let theme = ThemeDefinition::load(write(dir.path(), "t1.yaml", yaml)).unwrap();
        assert!(theme.javascripts[0].bottom);
        assert!(!theme.javascripts[0].is_async);
    }

    #[test]
    fn test_unknown_item_type_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{"name": "t1", "root": "/srv", "pattern": "/%resource%",
            "stylesheets": [{"name": "app.css", "type": "bundle", "src": []}]}"#;
        let err = ThemeDefinition::load(write(dir.path(), "t1.json", json)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Definition(_)));
    }

    #[test]
    fn test_missing_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = ThemeDefinition::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Definition(_)));
    }
}
