//! HTML fragments for resolved assets.
//!
//! Tags are written back to back without separators. Attribute values are
//! escaped; inline bodies are emitted verbatim.

use std::borrow::Cow;
use std::fmt::{Display, Formatter, Result as FmtResult};
use themer_storage::{Placement, Source};

use crate::assets::{Icon, Script, Stylesheet};

/// Placeholder for the asset host in stored file paths.
pub const HOST_PLACEHOLDER: &str = "%host%";

/// Substitute the asset host into a stored path.
///
/// A host ending in `/` followed by a path continuing with `/` yields a
/// single slash, so the default host `/` keeps paths absolute.
pub fn expand_host(path: &str, host: &str) -> String {
    let trimmed = host.strip_suffix('/').unwrap_or(host);
    path.replace(&format!("{HOST_PLACEHOLDER}/"), &format!("{trimmed}/")).replace(HOST_PLACEHOLDER, host)
}

/// Escapes a value for use inside a double-quoted attribute.
struct Attr<'a>(&'a str);
impl Display for Attr<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut rest = self.0;
        while let Some(index) = rest.find(['&', '<', '>', '"', '\'']) {
            f.write_str(&rest[..index])?;
            f.write_str(match rest.as_bytes()[index] {
                b'&' => "&amp;",
                b'<' => "&lt;",
                b'>' => "&gt;",
                b'"' => "&quot;",
                _ => "&#39;",
            })?;
            rest = &rest[index + 1..];
        }
        f.write_str(rest)
    }
}

/// URL of a link or file source. Inline sources have none.
fn href_of<'a>(source: &'a Source, host: &str) -> Option<Cow<'a, str>> {
    match source {
        Source::Link { source } => Some(Cow::Borrowed(source)),
        Source::File { path, .. } => Some(Cow::Owned(expand_host(path, host))),
        Source::Inline { .. } => None,
    }
}

pub(crate) struct StylesheetTags<'a> {
    pub host: &'a str,
    pub items: &'a [Stylesheet],
}
impl Display for StylesheetTags<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut inline = String::new();
        for item in self.items {
            let Some(href) = href_of(&item.source, self.host) else {
                if let Source::Inline { body } = &item.source {
                    inline.push_str(body);
                }
                continue;
            };
            f.write_str("<link rel=\"stylesheet\" type=\"text/css\"")?;
            if let Some(media) = &item.media {
                write!(f, " media=\"{}\"", Attr(media))?;
            }
            write!(f, " href=\"{}\" />", Attr(&href))?;
        }
        if !inline.is_empty() {
            write!(f, "<style>{inline}</style>")?;
        }
        Ok(())
    }
}

pub(crate) struct ScriptTags<'a> {
    pub host: &'a str,
    pub items: &'a [Script],
    pub placement: Placement,
}
impl Display for ScriptTags<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut inline = String::new();
        for item in self.items.iter().filter(|item| item.placement == self.placement) {
            let Some(href) = href_of(&item.source, self.host) else {
                if let Source::Inline { body } = &item.source {
                    inline.push_str(body);
                }
                continue;
            };
            f.write_str("<script type=\"text/javascript\"")?;
            if item.is_async {
                f.write_str(" async")?;
            }
            write!(f, " src=\"{}\"></script>", Attr(&href))?;
        }
        if !inline.is_empty() {
            write!(f, "<script type=\"text/javascript\">/*<![CDATA[*/{inline}/*]]>*/</script>")?;
        }
        Ok(())
    }
}

pub(crate) struct IconTags<'a> {
    pub host: &'a str,
    pub items: &'a [Icon],
}
impl Display for IconTags<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for item in self.items {
            let Some(href) = href_of(&item.source, self.host) else {
                tracing::debug!(name = %item.name, "Skipping inline icon");
                continue;
            };
            write!(f, "<link rel=\"{}\"", Attr(&item.rel))?;
            if let Some(sizes) = &item.sizes {
                write!(f, " sizes=\"{}\"", Attr(sizes))?;
            }
            write!(f, " href=\"{}\" />", Attr(&href))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("%host%/css/app.css", "https://cdn.example.com", "https://cdn.example.com/css/app.css")]
    #[case("%host%/css/app.css", "https://cdn.example.com/", "https://cdn.example.com/css/app.css")]
    #[case("%host%/css/app.css", "/", "/css/app.css")]
    #[case("%host%css/app.css", "/", "/css/app.css")]
    #[case("/static/app.css", "https://cdn.example.com", "/static/app.css")]
    fn test_expand_host(#[case] path: &str, #[case] host: &str, #[case] expected: &str) {
        assert_eq!(expand_host(path, host), expected);
    }

    #[test]
    fn test_attribute_escaping() {
        assert_eq!(Attr("a\"b<c>&d'e").to_string(), "a&quot;b&lt;c&gt;&amp;d&#39;e");
        assert_eq!(Attr("/css/app.css?v=1").to_string(), "/css/app.css?v=1");
    }

    #[test]
    fn test_stylesheet_tags() {
        let items = [
            Stylesheet {
                name: "print.css".to_string(),
                source: Source::Link { source: "https://fonts.example.com/css?a=1&b=2".to_string() },
                media: Some("print".to_string()),
            },
            Stylesheet { name: "a.css".to_string(), source: Source::Inline { body: "a{}".to_string() }, media: None },
            Stylesheet {
                name: "app.css".to_string(),
                source: Source::File { path: "%host%/app.css".to_string(), size: 3, version: None },
                media: None,
            },
            Stylesheet { name: "b.css".to_string(), source: Source::Inline { body: "b{}".to_string() }, media: None },
        ];
        let html = StylesheetTags { host: "https://cdn.example.com", items: &items }.to_string();
        assert_eq!(
            html,
            "<link rel=\"stylesheet\" type=\"text/css\" media=\"print\" \
             href=\"https://fonts.example.com/css?a=1&amp;b=2\" />\
             <link rel=\"stylesheet\" type=\"text/css\" href=\"https://cdn.example.com/app.css\" />\
             <style>a{}b{}</style>"
        );
    }

    #[test]
    fn test_script_tags_filter_placement() {
        let items = [
            Script {
                name: "analytics.js".to_string(),
                source: Source::Link { source: "https://a.example.com/a.js".to_string() },
                is_async: true,
                placement: Placement::Head,
            },
            Script {
                name: "app.js".to_string(),
                source: Source::File { path: "%host%/app.js".to_string(), size: 1, version: None },
                is_async: false,
                placement: Placement::Bottom,
            },
            Script {
                name: "boot.js".to_string(),
                source: Source::Inline { body: "boot();".to_string() },
                is_async: false,
                placement: Placement::Bottom,
            },
        ];
        let head = ScriptTags { host: "/", items: &items, placement: Placement::Head }.to_string();
        assert_eq!(head, "<script type=\"text/javascript\" async src=\"https://a.example.com/a.js\"></script>");
        let bottom = ScriptTags { host: "/", items: &items, placement: Placement::Bottom }.to_string();
        assert_eq!(
            bottom,
            "<script type=\"text/javascript\" src=\"/app.js\"></script>\
             <script type=\"text/javascript\">/*<![CDATA[*/boot();/*]]>*/</script>"
        );
    }

    #[test]
    fn test_icon_tags() {
        let items = [
            Icon {
                name: "favicon.icon".to_string(),
                source: Source::File { path: "%host%/favicon.ico".to_string(), size: 1, version: None },
                rel: "shortcut icon".to_string(),
                sizes: None,
            },
            Icon {
                name: "touch.icon".to_string(),
                source: Source::File { path: "%host%/touch.png".to_string(), size: 1, version: None },
                rel: "apple-touch-icon".to_string(),
                sizes: Some("180x180".to_string()),
            },
        ];
        let html = IconTags { host: "/", items: &items }.to_string();
        assert_eq!(
            html,
            "<link rel=\"shortcut icon\" href=\"/favicon.ico\" />\
             <link rel=\"apple-touch-icon\" sizes=\"180x180\" href=\"/touch.png\" />"
        );
    }

    #[test]
    fn test_empty_buckets_render_nothing() {
        assert_eq!(StylesheetTags { host: "/", items: &[] }.to_string(), "");
        assert_eq!(ScriptTags { host: "/", items: &[], placement: Placement::Bottom }.to_string(), "");
    }
}
