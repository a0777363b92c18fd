//! Converts wiki page Markdown into HTML with [`comrak`], which provides
//! the GitHub-flavored extensions the wiki relies on (tables, strikethrough,
//! task lists, footnotes, the raw-HTML tag filter and extended autolinks).
//! On top of that the renderer:
//!
//! * turns `[[Page]]`, `[[Text|Page]]` and `[[Page#anchor]]` wiki links into
//!   `<a class="internal ...">` anchors pointing at the page's source file
//!   under the home URL (see [`crate::links`] for how those are later
//!   rewritten to the static site's URL scheme),
//! * keeps links from nesting inside anchors written as raw HTML.

use crate::url::{child, Error as UrlError};
use crate::util::escape_html;
use comrak::nodes::{AstNode, NodeValue};
use comrak::{format_html, parse_document, Arena, Options};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::string::FromUtf8Error;
use std::sync::LazyLock;
use url::Url;

// Matches the start of a raw `<a ...>` or `</a>` tag. Group 1 is `/` for
// closing tags.
static RAW_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^<(/?)a[\s>]").expect("invalid raw anchor regex")
});

/// Renders wiki Markdown to HTML. Holds what's needed to resolve wiki links:
/// the base URL for internal links and the file name of every page keyed by
/// slug.
pub struct Renderer {
    home_url: Url,
    pages: HashMap<String, String>,
}

impl Renderer {
    /// Constructs a renderer. `pages` maps each page slug to its file name
    /// (e.g., `Getting-Started` to `Getting-Started.md`).
    pub fn new(home_url: &Url, pages: HashMap<String, String>) -> Renderer {
        Renderer {
            home_url: home_url.clone(),
            pages,
        }
    }

    /// Converts `markdown` to an HTML fragment.
    pub fn to_html(&self, markdown: &str) -> Result<String> {
        let mut options = Options::default();
        options.extension.strikethrough = true;
        options.extension.tagfilter = true;
        options.extension.table = true;
        options.extension.autolink = true;
        options.extension.tasklist = true;
        options.extension.footnotes = true;
        options.extension.wikilinks_title_before_pipe = true;
        options.render.unsafe_ = true;

        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &options);
        unnest_links(root);
        self.convert_wiki_links(root)?;

        let mut out = Vec::with_capacity(markdown.len() * 3 / 2);
        format_html(root, &options, &mut out).map_err(Error::Format)?;
        String::from_utf8(out).map_err(Error::NotUtf8)
    }

    /// Replaces every wiki link node with the HTML of an internal anchor.
    fn convert_wiki_links<'a>(&self, root: &'a AstNode<'a>) -> Result<()> {
        let links: Vec<(&'a AstNode<'a>, String)> = root
            .descendants()
            .filter_map(|node| match &node.data.borrow().value {
                NodeValue::WikiLink(link) => Some((node, link.url.clone())),
                _ => None,
            })
            .collect();

        for (node, target) in links {
            let label = text_content(node);
            let html = self.wiki_link(&label, &target)?;
            for child in node.children().collect::<Vec<_>>() {
                child.detach();
            }
            node.data.borrow_mut().value = NodeValue::HtmlInline(html);
        }
        Ok(())
    }

    /// Renders a single wiki link as an internal anchor.
    fn wiki_link(&self, label: &str, target: &str) -> Result<String> {
        let target = target.trim();
        let label = match label.trim() {
            "" => target,
            label => label,
        };
        let (name, fragment) = match target.split_once('#') {
            Some((name, fragment)) => (name.trim(), Some(fragment)),
            None => (target, None),
        };
        let slug = name.replace(' ', "-");

        let (status, mut href) = match self.pages.get(&slug) {
            Some(file_name) => ("present", child(&self.home_url, &[file_name])?),
            None => ("absent", child(&self.home_url, &[&slug])?),
        };
        href.set_fragment(fragment);

        Ok(format!(
            r#"<a class="internal {}" href="{}">{}</a>"#,
            status,
            escape_html(href.as_str()),
            escape_html(label),
        ))
    }
}

/// The concatenated text and code of `node`'s descendants.
fn text_content<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    for descendant in node.descendants().skip(1) {
        match &descendant.data.borrow().value {
            NodeValue::Text(t) => text.push_str(t),
            NodeValue::Code(code) => text.push_str(&code.literal),
            _ => {}
        }
    }
    text
}

/// Unwraps links (autolinks in particular) that sit between a raw `<a>` and
/// its `</a>`, keeping their text. Anchors don't nest in HTML.
fn unnest_links<'a>(root: &'a AstNode<'a>) {
    let mut depth = 0usize;
    let mut nested = Vec::new();
    for node in root.descendants() {
        match &node.data.borrow().value {
            value if value.block() => depth = 0,
            NodeValue::HtmlInline(raw) => match RAW_ANCHOR.captures(raw) {
                Some(captures) if captures.get(1).map_or(false, |m| m.is_empty()) => {
                    depth += 1
                }
                Some(_) => depth = depth.saturating_sub(1),
                None => {}
            },
            NodeValue::Link(_) if depth > 0 => nested.push(node),
            _ => {}
        }
    }

    for link in nested {
        for child in link.children().collect::<Vec<_>>() {
            link.insert_before(child);
        }
        link.detach();
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents an error converting markdown to HTML.
#[derive(Debug)]
pub enum Error {
    /// Returned when an internal link URL can't be built from the home URL.
    Url(UrlError),

    /// Returned when the HTML can't be written out.
    Format(std::io::Error),

    /// Returned when the rendered HTML isn't valid UTF-8.
    NotUtf8(FromUtf8Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Url(err) => write!(f, "Building internal link: {}", err),
            Error::Format(err) => write!(f, "Formatting HTML: {}", err),
            Error::NotUtf8(err) => write!(f, "Rendered HTML: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Url(err) => Some(err),
            Error::Format(err) => Some(err),
            Error::NotUtf8(err) => Some(err),
        }
    }
}

impl From<UrlError> for Error {
    /// Converts a [`UrlError`] into an [`Error`]. It allows us to use the `?`
    /// operator when building link URLs.
    fn from(err: UrlError) -> Error {
        Error::Url(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn renderer() -> anyhow::Result<Renderer> {
        let mut pages = HashMap::new();
        pages.insert("Getting-Started".to_owned(), "Getting-Started.md".to_owned());
        pages.insert("FAQ".to_owned(), "FAQ.markdown".to_owned());
        Ok(Renderer::new(&Url::parse("https://example.org/wiki")?, pages))
    }

    fn render(markdown: &str) -> anyhow::Result<String> {
        Ok(renderer()?.to_html(markdown)?)
    }

    #[test]
    fn test_wiki_link_present() -> anyhow::Result<()> {
        assert_eq!(
            "<p>See <a class=\"internal present\" href=\"https://example.org/wiki/Getting-Started.md\">Getting Started</a>.</p>\n",
            render("See [[Getting Started]].")?,
        );
        Ok(())
    }

    #[test]
    fn test_wiki_link_with_label_and_anchor() -> anyhow::Result<()> {
        assert_eq!(
            "<p><a class=\"internal present\" href=\"https://example.org/wiki/FAQ.markdown#install\">the FAQ</a></p>\n",
            render("[[the FAQ|FAQ#install]]")?,
        );
        Ok(())
    }

    #[test]
    fn test_wiki_link_absent() -> anyhow::Result<()> {
        assert_eq!(
            "<p><a class=\"internal absent\" href=\"https://example.org/wiki/Not-Yet\">Not Yet</a></p>\n",
            render("[[Not Yet]]")?,
        );
        Ok(())
    }

    #[test]
    fn test_wiki_link_label_escaped() -> anyhow::Result<()> {
        let html = render("[[Tom & Jerry|FAQ]]")?;
        assert!(html.contains(">Tom &amp; Jerry</a>"), "{}", html);
        Ok(())
    }

    #[test]
    fn test_wiki_link_ignored_in_code() -> anyhow::Result<()> {
        assert_eq!(
            "<p><code>[[FAQ]]</code></p>\n<pre><code>[[FAQ]]\n</code></pre>\n",
            render("`[[FAQ]]`\n\n```\n[[FAQ]]\n```")?,
        );
        Ok(())
    }

    #[test]
    fn test_autolink() -> anyhow::Result<()> {
        assert_eq!(
            "<p>Visit <a href=\"https://rust-lang.org/learn\">https://rust-lang.org/learn</a>, or <a href=\"http://www.example.com\">www.example.com</a>.</p>\n",
            render("Visit https://rust-lang.org/learn, or www.example.com.")?,
        );
        Ok(())
    }

    #[test]
    fn test_autolink_not_inside_link() -> anyhow::Result<()> {
        assert_eq!(
            "<p><a href=\"https://a.org\">https://a.org</a></p>\n",
            render("[https://a.org](https://a.org)")?,
        );
        Ok(())
    }

    #[test]
    fn test_autolink_needs_word_boundary() -> anyhow::Result<()> {
        let html = render("foohttps://a.org bar")?;
        assert!(!html.contains("<a"), "{}", html);
        Ok(())
    }

    #[test]
    fn test_autolink_keeps_balanced_parens() -> anyhow::Result<()> {
        let html = render("see (https://en.wikipedia.org/wiki/Rust_(language))")?;
        assert!(
            html.contains(r#"href="https://en.wikipedia.org/wiki/Rust_(language)""#),
            "{}",
            html
        );
        Ok(())
    }

    #[test]
    fn test_autolink_not_inside_raw_anchor() -> anyhow::Result<()> {
        assert_eq!(
            "<p><a href=\"x\">https://a.org</a></p>\n",
            render("<a href=\"x\">https://a.org</a>")?,
        );
        Ok(())
    }

    #[test]
    fn test_tag_filter() -> anyhow::Result<()> {
        let html = render("<script>alert(1)</script>\n\n<details>ok</details>")?;
        assert!(html.contains("&lt;script>alert(1)&lt;/script>"), "{}", html);
        assert!(html.contains("<details>ok</details>"), "{}", html);
        Ok(())
    }

    #[test]
    fn test_gfm_extensions() -> anyhow::Result<()> {
        let html = render("~~old~~\n\n- [x] done\n\n| a |\n|---|\n| b |\n")?;
        assert!(html.contains("<del>old</del>"), "{}", html);
        assert!(html.contains("type=\"checkbox\""), "{}", html);
        assert!(html.contains("<table>"), "{}", html);
        Ok(())
    }
}
