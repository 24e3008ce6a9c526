//! Source filters and minifiers.
//!
//! A [`Filter`] turns one raw source into the text that is concatenated into
//! the final body. A [`Minifier`] compresses a body when the item asks for
//! it. Both are pluggable so hosts can wire in external tools.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{ErrorKind, Result};

pub trait Filter: Send + Sync {
    /// `path` is the location `contents` was read from, used to resolve
    /// relative imports.
    fn apply(&self, path: &Path, contents: &str) -> Result<String>;
}

/// Leaves sources untouched.
pub struct PassThrough;
impl Filter for PassThrough {
    fn apply(&self, _path: &Path, contents: &str) -> Result<String> {
        Ok(contents.to_string())
    }
}

/// Compiles SCSS with `grass`, resolving imports next to the source.
pub struct ScssFilter;
impl Filter for ScssFilter {
    fn apply(&self, path: &Path, contents: &str) -> Result<String> {
        let mut options = grass::Options::default();
        if let Some(parent) = path.parent() {
            options = options.load_path(parent);
        }
        compile(contents, &options)
    }
}

/// Named filters an item can refer to.
///
/// Stylesheets and scripts each have their own registry, so a filter is only
/// found for the kind of item it was registered for. Stylesheets know `css`
/// and `scss`, scripts know `js`. Anything else, including `less` and
/// `coffee`, is unsupported until registered.
#[derive(Clone)]
pub struct FilterRegistry {
    filters: HashMap<String, Arc<dyn Filter>>,
}
impl FilterRegistry {
    pub fn empty() -> Self {
        Self { filters: HashMap::new() }
    }

    pub fn register(&mut self, name: impl Into<String>, filter: impl Filter + 'static) -> &mut Self {
        self.filters.insert(name.into(), Arc::new(filter));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Filter> {
        self.filters.get(name).map(|filter| filter.as_ref())
    }

    pub fn stylesheets() -> Self {
        let mut registry = Self::empty();
        registry.register("css", PassThrough).register("scss", ScssFilter);
        registry
    }

    pub fn scripts() -> Self {
        let mut registry = Self::empty();
        registry.register("js", PassThrough);
        registry
    }
}

fn compile(source: &str, options: &grass::Options<'_>) -> Result<String> {
    match grass::from_string(source, options) {
        Ok(css) => Ok(css),
        Err(e) => exn::bail!(ErrorKind::Compile(e.to_string())),
    }
}

pub trait Minifier: Send + Sync {
    fn minify(&self, body: &str) -> Result<String>;
}

/// Re-emits a stylesheet with `grass` in compressed style.
pub struct CssMinifier;
impl Minifier for CssMinifier {
    fn minify(&self, body: &str) -> Result<String> {
        let options = grass::Options::default().style(grass::OutputStyle::Compressed);
        compile(body, &options)
    }
}

/// Trims every line of a script and drops blank ones.
pub struct JsMinifier;
impl Minifier for JsMinifier {
    fn minify(&self, body: &str) -> Result<String> {
        Ok(body.lines().map(str::trim).filter(|line| !line.is_empty()).collect::<Vec<_>>().join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("css", true, false)]
    #[case("scss", true, false)]
    #[case("js", false, true)]
    #[case("less", false, false)]
    #[case("coffee", false, false)]
    fn test_default_registries(#[case] name: &str, #[case] stylesheet: bool, #[case] script: bool) {
        assert_eq!(FilterRegistry::stylesheets().get(name).is_some(), stylesheet);
        assert_eq!(FilterRegistry::scripts().get(name).is_some(), script);
    }

    #[test]
    fn test_register_custom_filter() {
        struct Upper;
        impl Filter for Upper {
            fn apply(&self, _path: &Path, contents: &str) -> Result<String> {
                Ok(contents.to_uppercase())
            }
        }
        let mut registry = FilterRegistry::empty();
        registry.register("upper", Upper);
        let filter = registry.get("upper").unwrap();
        assert_eq!(filter.apply(Path::new("a.txt"), "abc").unwrap(), "ABC");
        assert!(registry.get("css").is_none());
    }

    #[test]
    fn test_scss_compiles_nesting() {
        let css = ScssFilter.apply(Path::new("app.scss"), "$c: red;\n.a { .b { color: $c; } }").unwrap();
        assert!(css.contains(".a .b"));
        assert!(css.contains("color: red"));
    }

    #[test]
    fn test_scss_syntax_error() {
        let err = ScssFilter.apply(Path::new("app.scss"), ".a { color: $missing; }").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Compile(_)));
    }

    #[test]
    fn test_css_minifier() {
        let css = CssMinifier.minify("a {\n  color: red;\n}\n\nb {\n  margin: 0;\n}\n").unwrap();
        assert!(css.contains("a{color:red}"));
        assert!(!css.trim().contains('\n'));
    }

    #[test]
    fn test_js_minifier() {
        let js = JsMinifier.minify("  var a = 1;\n\n\tfoo(a);  \n").unwrap();
        assert_eq!(js, "var a = 1;\nfoo(a);");
    }
}
