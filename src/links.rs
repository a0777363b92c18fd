//! Rewrites internal links in rendered page HTML so they point at the static
//! site's pages rather than the wiki's source files: an anchor marked with the
//! `internal` class and pointing at `.../Some-Page.md` is rewritten to point
//! at `.../Some-Page`. Nothing outside the `href` value is touched.

use crate::util::escape_html;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use url::{ParseError, Url};

static START_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a(?:\s+[^>"']*(?:"[^"]*"|'[^']*')?)*\s*/?>"#)
        .expect("invalid anchor regex")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#,
    )
    .expect("invalid attribute regex")
});

/// An attribute of an anchor start tag. `value` is the byte range of the
/// attribute's value within the tag, if it has one.
struct Attribute<'t> {
    name: &'t str,
    value: Option<(usize, usize)>,
}

/// A parsed `<a ...>` start tag. Borrowed from the fragment being rewritten
/// and dropped at the end of [`rewrite_internal_links`].
struct Anchor<'t> {
    tag: &'t str,
    attributes: Vec<Attribute<'t>>,
}

impl<'t> Anchor<'t> {
    fn parse(tag: &'t str) -> Anchor<'t> {
        // Skip `<a`; the remainder is the attribute list.
        let offset = 2;
        let attributes = ATTRIBUTE
            .captures_iter(&tag[offset..])
            .filter_map(|captures| {
                let name = captures.get(1)?.as_str();
                let value = (2..=4)
                    .find_map(|i| captures.get(i))
                    .map(|m| (offset + m.start(), offset + m.end()));
                Some(Attribute { name, value })
            })
            .collect();
        Anchor { tag, attributes }
    }

    fn value(&self, name: &str) -> Option<Option<&'t str>> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name.eq_ignore_ascii_case(name))
            .map(|attribute| {
                attribute.value.map(|(start, end)| &self.tag[start..end])
            })
    }

    fn is_internal(&self) -> bool {
        match self.value("class") {
            Some(Some(classes)) => {
                classes.split_ascii_whitespace().any(|c| c == "internal")
            }
            _ => false,
        }
    }

    /// Returns the tag with its `href` value replaced by `href`.
    fn with_href(&self, href: &str) -> Result<String> {
        let (start, end) = self
            .attributes
            .iter()
            .find(|attribute| attribute.name.eq_ignore_ascii_case("href"))
            .and_then(|attribute| attribute.value)
            .ok_or_else(|| Error::MissingHref(self.tag.to_owned()))?;

        // `escape_html` leaves `'` alone, which would end a single-quoted
        // value early.
        let escaped = escape_html(href).replace('\'', "&#39;");
        let quoted = matches!(self.tag[..start].chars().last(), Some('"' | '\''));
        let mut out = String::with_capacity(self.tag.len() + 2);
        out.push_str(&self.tag[..start]);
        match quoted {
            true => out.push_str(&escaped),
            false => {
                out.push('"');
                out.push_str(&escaped);
                out.push('"');
            }
        }
        out.push_str(&self.tag[end..]);
        Ok(out)
    }
}

/// Rewrites every internal anchor in `html` so that its target path has its
/// file extension removed. Scheme, host, query and fragment are preserved,
/// as is everything outside the rewritten `href` values. Non-internal
/// anchors are left alone.
pub fn rewrite_internal_links(html: &str) -> Result<String> {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for m in START_TAG.find_iter(html) {
        let anchor = Anchor::parse(m.as_str());
        if !anchor.is_internal() {
            continue;
        }
        let href = match anchor.value("href") {
            Some(Some(href)) => href,
            _ => return Err(Error::MissingHref(m.as_str().to_owned())),
        };
        out.push_str(&html[last..m.start()]);
        out.push_str(&anchor.with_href(&strip_href_extension(&unescape(href))?)?);
        last = m.end();
    }
    out.push_str(&html[last..]);
    Ok(out)
}

/// Removes the extension from the path of `href`. Absolute URLs must parse;
/// relative references are split at the first `?` or `#` so only their path
/// is modified.
fn strip_href_extension(href: &str) -> Result<String> {
    match Url::parse(href) {
        Ok(mut url) => {
            let path = strip_extension(url.path()).to_owned();
            url.set_path(&path);
            Ok(url.to_string())
        }
        Err(ParseError::RelativeUrlWithoutBase) => {
            let split = href
                .find(|c: char| c == '?' || c == '#')
                .unwrap_or(href.len());
            let (path, rest) = href.split_at(split);
            Ok(format!("{}{}", strip_extension(path), rest))
        }
        Err(err) => Err(Error::MalformedHref {
            href: href.to_owned(),
            err,
        }),
    }
}

/// Removes the last `.suffix` from the final segment of `path`. Dot-files
/// (`.md`) and directory paths (`wiki/`) are returned unchanged.
fn strip_extension(path: &str) -> &str {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(0) | None => path,
        Some(dot) => &path[..name_start + dot],
    }
}

/// Reverses the entity escaping an attribute value may carry. Only the
/// entities our own escaping produces are recognised.
fn unescape(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

type Result<T> = std::result::Result<T, Error>;

/// Returned when an internal link can't be rewritten. Internal links must
/// never silently break, so both variants abort the build.
#[derive(Debug)]
pub enum Error {
    /// The anchor's `href` is not a valid URL.
    MalformedHref { href: String, err: ParseError },

    /// The anchor is marked internal but has no `href` value.
    MissingHref(String),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MalformedHref { href, err } => {
                write!(f, "Malformed internal link `{}`: {}", href, err)
            }
            Error::MissingHref(tag) => {
                write!(f, "Internal link without href: {}", tag)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MalformedHref { href: _, err } => Some(err),
            Error::MissingHref(_) => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rewrite_absolute() -> Result<()> {
        fixture(
            r#"<p><a class="internal present" href="https://example.org/wiki/Getting-Started">Getting Started</a></p>"#,
            r#"<p><a class="internal present" href="https://example.org/wiki/Getting-Started.md">Getting Started</a></p>"#,
        )
    }

    #[test]
    fn test_rewrite_keeps_query_and_fragment() -> Result<()> {
        fixture(
            r#"<a class="internal" href="https://example.org/wiki/FAQ?x=1&amp;y=2#install">FAQ</a>"#,
            r#"<a class="internal" href="https://example.org/wiki/FAQ.md?x=1&amp;y=2#install">FAQ</a>"#,
        )
    }

    #[test]
    fn test_rewrite_relative() -> Result<()> {
        fixture(
            r#"<a href='/wiki/Release-1.2#notes' class='internal'>x</a>"#,
            r#"<a href='/wiki/Release-1.2.md#notes' class='internal'>x</a>"#,
        )
    }

    #[test]
    fn test_rewrite_keeps_apostrophe_escaped() -> Result<()> {
        fixture(
            r#"<a class='internal' href='/wiki/It&#39;s'>x</a>"#,
            r#"<a class='internal' href='/wiki/It&#39;s.md'>x</a>"#,
        )?;
        fixture(
            r#"<a class="internal" href="/wiki/It&#39;s">x</a>"#,
            r#"<a class="internal" href="/wiki/It's.md">x</a>"#,
        )
    }

    #[test]
    fn test_rewrite_unquoted_href() -> Result<()> {
        fixture(
            r#"<a class=internal href="FAQ">x</a>"#,
            r#"<a class=internal href=FAQ.md>x</a>"#,
        )
    }

    #[test]
    fn test_external_links_untouched() -> Result<()> {
        let html = r#"<a href="https://example.org/file.md">x</a> <a class="internalish" href="a.md">y</a>"#;
        fixture(html, html)
    }

    #[test]
    fn test_only_last_extension_removed() -> Result<()> {
        fixture(
            r#"<a class="internal" href="https://example.org/wiki/archive.tar">x</a>"#,
            r#"<a class="internal" href="https://example.org/wiki/archive.tar.gz">x</a>"#,
        )
    }

    #[test]
    fn test_dotfile_and_directory_untouched() -> Result<()> {
        let html = r#"<a class="internal" href="https://example.org/wiki/.md">x</a><a class="internal" href="https://example.org/v1.0/">y</a>"#;
        fixture(html, html)
    }

    #[test]
    fn test_idempotent_on_stripped_paths() -> Result<()> {
        let input = r#"<a class="internal absent" href="https://example.org/wiki/New-Page.md">New Page</a>"#;
        let once = rewrite_internal_links(input)?;
        assert_eq!(once, rewrite_internal_links(&once)?);
        Ok(())
    }

    #[test]
    fn test_malformed_href_fails() {
        let html = r#"<a class="internal" href="https://[::1/Page.md">x</a>"#;
        assert!(matches!(
            rewrite_internal_links(html),
            Err(Error::MalformedHref { .. })
        ));
    }

    #[test]
    fn test_missing_href_fails() {
        let html = r#"<a class="internal" name="top">x</a>"#;
        assert!(matches!(
            rewrite_internal_links(html),
            Err(Error::MissingHref(_))
        ));
    }

    fn fixture(wanted: &str, html: &str) -> Result<()> {
        assert_eq!(wanted, rewrite_internal_links(html)?);
        Ok(())
    }
}
