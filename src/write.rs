//! Renders pages through the site template and writes them to disk.
//!
//! Each output document is rendered from a typed context: the
//! [`SiteContext`] shared by every page, plus either an [`ArticleContext`]
//! or a [`HomeContext`]. Contexts are converted into a single
//! [`Value::Object`] only when the template is executed. `gtmpl` reports a
//! reference to a field that an object doesn't have as an execution error,
//! so a template that uses a field the current mode doesn't provide fails
//! the build rather than rendering a blank.

use crate::config::Config;
use crate::links::{rewrite_internal_links, Error as LinkError};
use crate::math::has_math;
use crate::metadata::PageMetadata;
use crate::site::PageSummary;
use crate::util::escape_html;
use crate::wiki::WikiPage;
use gtmpl::{Context, Template, Value};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

type Fields = HashMap<String, Value>;

fn insert<V: Into<Value>>(fields: &mut Fields, key: &str, value: V) {
    fields.insert(key.to_owned(), value.into());
}

/// Template fields derived from the configuration, the same for every page.
pub struct SiteContext {
    site_name: String,
    site_url: String,
    publisher_name: String,
    publisher_url: String,
    publisher_logo_url: String,
    home_url: String,
    license_url: String,
    stylesheet_url: String,
    mathjax_config_script_url: String,
}

impl SiteContext {
    pub fn new(config: &Config) -> SiteContext {
        SiteContext {
            site_name: config.escaped_site_name(),
            site_url: config.site_url.to_string(),
            publisher_name: config.escaped_publisher_name(),
            publisher_url: config.publisher_url.to_string(),
            publisher_logo_url: config.publisher_logo_url.to_string(),
            home_url: config.home_url.to_string(),
            license_url: config.license_url.to_string(),
            stylesheet_url: config.stylesheet_url.to_string(),
            mathjax_config_script_url: config.mathjax_config_script_url.to_string(),
        }
    }

    fn insert_into(&self, fields: &mut Fields) {
        insert(fields, "site_name", self.site_name.clone());
        insert(fields, "site_url", self.site_url.clone());
        insert(fields, "publisher_name", self.publisher_name.clone());
        insert(fields, "publisher_url", self.publisher_url.clone());
        insert(fields, "publisher_logo_url", self.publisher_logo_url.clone());
        insert(fields, "home_url", self.home_url.clone());
        insert(fields, "license_url", self.license_url.clone());
        insert(fields, "stylesheet_url", self.stylesheet_url.clone());
        insert(
            fields,
            "mathjax_config_script_url",
            self.mathjax_config_script_url.clone(),
        );
    }
}

/// The fields specific to one render mode.
pub trait ModeContext {
    fn is_home(&self) -> bool;
    fn insert_into(self, fields: &mut Fields);
}

/// Fields for an article page. Free text is escaped on construction.
pub struct ArticleContext {
    main_heading: String,
    canonical_url: String,
    wiki_page_url: String,
    published_date_iso: String,
    published_date_display: String,
    is_modified: bool,
    modified_date_iso: String,
    modified_date_display: String,
    author_name: String,
    author_url: String,
}

impl ArticleContext {
    pub fn new(metadata: &PageMetadata) -> ArticleContext {
        ArticleContext {
            main_heading: escape_html(&metadata.title),
            canonical_url: metadata.canonical_url.to_string(),
            wiki_page_url: metadata.wiki_page_url.to_string(),
            published_date_iso: metadata.published.iso.clone(),
            published_date_display: metadata.published.display.clone(),
            is_modified: metadata.is_modified(),
            modified_date_iso: metadata.modified().iso.clone(),
            modified_date_display: metadata.modified().display.clone(),
            author_name: escape_html(&metadata.author_name),
            author_url: metadata.author_url.to_string(),
        }
    }
}

impl ModeContext for ArticleContext {
    fn is_home(&self) -> bool {
        false
    }

    fn insert_into(self, fields: &mut Fields) {
        insert(fields, "main_heading", self.main_heading);
        insert(fields, "canonical_url", self.canonical_url);
        insert(fields, "wiki_page_url", self.wiki_page_url);
        insert(fields, "published_date_iso", self.published_date_iso);
        insert(fields, "published_date_display", self.published_date_display);
        insert(fields, "is_modified", self.is_modified);
        insert(fields, "modified_date_iso", self.modified_date_iso);
        insert(fields, "modified_date_display", self.modified_date_display);
        insert(fields, "author_name", self.author_name);
        insert(fields, "author_url", self.author_url);
    }
}

/// One entry of the home page listing.
pub struct ListingEntry {
    title: String,
    url: String,
    canonical_url: String,
    published_date_iso: String,
    published_date_display: String,
    modified_date_iso: String,
}

impl From<&PageSummary> for ListingEntry {
    fn from(summary: &PageSummary) -> ListingEntry {
        ListingEntry {
            title: escape_html(&summary.title),
            url: summary.url.to_string(),
            canonical_url: summary.canonical_url.to_string(),
            published_date_iso: summary.published_iso.clone(),
            published_date_display: summary.published_display.clone(),
            modified_date_iso: summary.modified_iso.clone(),
        }
    }
}

impl From<ListingEntry> for Value {
    /// Converts a [`ListingEntry`] into a [`Value::Object`] for templating.
    fn from(entry: ListingEntry) -> Value {
        let mut m = Fields::new();
        insert(&mut m, "title", entry.title);
        insert(&mut m, "url", entry.url);
        insert(&mut m, "canonical_url", entry.canonical_url);
        insert(&mut m, "published_date_iso", entry.published_date_iso);
        insert(&mut m, "published_date_display", entry.published_date_display);
        insert(&mut m, "modified_date_iso", entry.modified_date_iso);
        Value::Object(m)
    }
}

/// Fields for the home page.
pub struct HomeContext {
    main_heading: String,
    canonical_url: String,
    wiki_page_url: String,
    all_pages: Vec<ListingEntry>,
}

impl HomeContext {
    /// `pages` is the listing, already in display order.
    pub fn new(config: &Config, pages: &[&PageSummary]) -> HomeContext {
        HomeContext {
            main_heading: escape_html(&config.home_heading),
            canonical_url: config.site_url.to_string(),
            wiki_page_url: config.wiki_url.to_string(),
            all_pages: pages.iter().map(|&summary| summary.into()).collect(),
        }
    }
}

impl ModeContext for HomeContext {
    fn is_home(&self) -> bool {
        true
    }

    fn insert_into(self, fields: &mut Fields) {
        insert(fields, "main_heading", self.main_heading);
        insert(fields, "canonical_url", self.canonical_url);
        insert(fields, "wiki_page_url", self.wiki_page_url);
        insert(
            fields,
            "all_pages",
            Value::Array(self.all_pages.into_iter().map(Value::from).collect()),
        );
    }
}

/// Renders pages with the site template and writes them into the output
/// directory.
pub struct Writer<'a> {
    /// The compiled site template.
    pub template: &'a Template,

    pub site: &'a SiteContext,

    /// The footer shown on every page, already link-rewritten.
    pub page_footer_html: &'a str,

    pub output_directory: &'a Path,
}

impl Writer<'_> {
    /// Renders an article page to `{slug}.html`.
    pub fn write_article(&self, page: &WikiPage, metadata: &PageMetadata) -> Result<PathBuf> {
        self.write_page(
            &format!("{}.html", page.slug),
            page,
            ArticleContext::new(metadata),
        )
    }

    /// Renders the home page to `index.html`.
    pub fn write_home(
        &self,
        config: &Config,
        page: &WikiPage,
        pages: &[&PageSummary],
    ) -> Result<PathBuf> {
        self.write_page("index.html", page, HomeContext::new(config, pages))
    }

    /// Renders `page` with the mode-specific `context` and writes the result
    /// to `file_name` in the output directory.
    fn write_page<M: ModeContext>(
        &self,
        file_name: &str,
        page: &WikiPage,
        context: M,
    ) -> Result<PathBuf> {
        let article_body_html = rewrite_internal_links(&page.formatted_data).map_err(|err| {
            Error::Link {
                slug: page.slug.clone(),
                err,
            }
        })?;

        let mut fields = Fields::new();
        self.site.insert_into(&mut fields);
        insert(&mut fields, "is_home", context.is_home());
        insert(&mut fields, "has_math", has_math(page.text_data()));
        insert(&mut fields, "article_body_html", article_body_html);
        insert(&mut fields, "page_footer_html", self.page_footer_html.to_owned());
        context.insert_into(&mut fields);

        let html = Context::from(Value::Object(fields))
            .and_then(|context| self.template.render(&context))
            .map_err(|err| Error::Template {
                slug: page.slug.clone(),
                err,
            })?;

        let path = self.output_directory.join(file_name);
        std::fs::write(&path, html).map_err(|err| Error::Io {
            path: path.clone(),
            err,
        })?;
        tracing::info!(slug = %page.slug, path = %path.display(), "Wrote page");
        Ok(path)
    }
}

/// Parses the site template from `source`. Template syntax errors,
/// including calls to undefined functions, are reported here.
pub fn parse_template(source: &str) -> std::result::Result<Template, String> {
    let mut template = Template::default();
    template.parse(source)?;
    Ok(template)
}

/// The result of a fallible page-writing operation.
type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An internal link in the page can't be rewritten.
    Link { slug: String, err: LinkError },

    /// An error during templating, e.g. a reference to a missing field.
    Template { slug: String, err: String },

    /// An error writing the output file.
    Io { path: PathBuf, err: io::Error },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Link { slug, err } => write!(f, "Page '{}': {}", slug, err),
            Error::Template { slug, err } => {
                write!(f, "Rendering template for page '{}': {}", slug, err)
            }
            Error::Io { path, err } => {
                write!(f, "Writing '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Link { slug: _, err } => Some(err),
            Error::Template { .. } => None,
            Error::Io { path: _, err } => Some(err),
        }
    }
}
