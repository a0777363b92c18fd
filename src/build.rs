//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: reading the wiki
//! ([`crate::wiki`]), resolving each page's metadata ([`crate::metadata`]),
//! rendering article and home pages ([`crate::write`]) and writing the
//! sitemap ([`crate::sitemap`]).

use crate::config::Config;
use crate::links::{rewrite_internal_links, Error as LinkError};
use crate::metadata::{Error as MetadataError, PageMetadata};
use crate::site::{
    by_modified_descending, by_published_descending, is_article, PageSummary, SiteIndex,
};
use crate::sitemap::write_sitemap;
use crate::url::Error as UrlError;
use crate::wiki::{Error as WikiError, GitWiki, HistoryQuery, PageStore, WikiPage};
use crate::write::{parse_template, Error as WriteError, SiteContext, Writer};
use gtmpl::Template;
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

const HOME_SLUG: &str = "Home";

/// What a build produced.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// The number of article pages written (not counting the home page).
    pub articles: usize,

    /// The number of pages that weren't converted.
    pub skipped: usize,
}

/// Builds the site from a [`Config`]: opens the wiki repository, parses the
/// template and calls [`build_from_store`].
pub fn build_site(config: &Config) -> Result<BuildReport> {
    let store = GitWiki::open(&config.wiki_repository, &config.home_url)?;
    let template = load_template(&config.template)?;
    build_from_store(config, &store, &template)
}

/// Builds the site from the pages in `store`, rendering them with
/// `template`. Any failure aborts the build.
pub fn build_from_store<S: PageStore>(
    config: &Config,
    store: &S,
    template: &Template,
) -> Result<BuildReport> {
    std::fs::create_dir_all(&config.output_directory).map_err(|err| Error::Io {
        path: config.output_directory.clone(),
        err,
    })?;

    let page_footer_html = match store.footer()? {
        Some(footer) => rewrite_internal_links(&footer.formatted_data)?,
        None => String::new(),
    };
    let site = SiteContext::new(config);
    let writer = Writer {
        template,
        site: &site,
        page_footer_html: &page_footer_html,
        output_directory: &config.output_directory,
    };

    let mut report = BuildReport::default();
    let mut index = SiteIndex::default();
    let mut home: Option<WikiPage> = None;
    for page in store.pages()? {
        if page.slug == HOME_SLUG {
            home = Some(page);
            continue;
        }
        if !is_article(&page) {
            tracing::debug!(slug = %page.slug, format = ?page.format, "Skipping page");
            report.skipped += 1;
            continue;
        }

        let versions = store.versions(&page, &HistoryQuery::full())?;
        let metadata = PageMetadata::resolve(&page.slug, &versions, config)?;
        writer.write_article(&page, &metadata)?;
        index.push(PageSummary::new(&metadata, &config.home_url)?);
        report.articles += 1;
    }

    let home = home.ok_or(Error::MissingHomePage)?;
    let listing = by_published_descending(index.summaries(), &config.site_name);
    writer.write_home(config, &home, &listing)?;

    let sitemap_path = config.output_directory.join("sitemap.xml");
    let sitemap_file = File::create(&sitemap_path).map_err(|err| Error::Io {
        path: sitemap_path.clone(),
        err,
    })?;
    write_sitemap(
        &config.site_url,
        &by_modified_descending(index.summaries()),
        BufWriter::new(sitemap_file),
    )
    .map_err(|err| Error::Io {
        path: sitemap_path.clone(),
        err,
    })?;
    tracing::info!(path = %sitemap_path.display(), "Wrote sitemap");

    tracing::info!(
        articles = report.articles,
        skipped = report.skipped,
        output = %config.output_directory.display(),
        "Built site"
    );
    Ok(report)
}

// Loads the template file and parses it.
fn load_template(path: &Path) -> Result<Template> {
    let source = std::fs::read_to_string(path).map_err(|err| Error::OpenTemplateFile {
        path: path.to_owned(),
        err,
    })?;
    parse_template(&source).map_err(|err| Error::ParseTemplate {
        path: path.to_owned(),
        err,
    })
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Every error aborts the build; a
/// partially written site is never reported as a success.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors reading pages or history from the wiki.
    Wiki(WikiError),

    /// Returned when a page's metadata can't be resolved.
    Metadata(MetadataError),

    /// Returned for errors rendering or writing pages.
    Write(WriteError),

    /// Returned when the footer's internal links can't be rewritten.
    Link(LinkError),

    /// Returned when a listing URL can't be built.
    Url(UrlError),

    /// Returned when the wiki has no `Home` page.
    MissingHomePage,

    /// Returned for I/O problems while opening the template file.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing the template file.
    ParseTemplate { path: PathBuf, err: String },

    /// Returned for other I/O errors.
    Io { path: PathBuf, err: std::io::Error },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Wiki(err) => err.fmt(f),
            Error::Metadata(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Link(err) => write!(f, "Footer: {}", err),
            Error::Url(err) => err.fmt(f),
            Error::MissingHomePage => {
                write!(f, "The wiki has no `{}` page", HOME_SLUG)
            }
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate { path, err } => {
                write!(f, "Parsing template file '{}': {}", path.display(), err)
            }
            Error::Io { path, err } => write!(f, "'{}': {}", path.display(), err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Wiki(err) => Some(err),
            Error::Metadata(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Link(err) => Some(err),
            Error::Url(err) => Some(err),
            Error::MissingHomePage => None,
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate { .. } => None,
            Error::Io { path: _, err } => Some(err),
        }
    }
}

impl From<WikiError> for Error {
    /// Converts [`WikiError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WikiError) -> Error {
        Error::Wiki(err)
    }
}

impl From<MetadataError> for Error {
    /// Converts [`MetadataError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: MetadataError) -> Error {
        Error::Metadata(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

impl From<LinkError> for Error {
    /// Converts [`LinkError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: LinkError) -> Error {
        Error::Link(err)
    }
}

impl From<UrlError> for Error {
    /// Converts [`UrlError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: UrlError) -> Error {
        Error::Url(err)
    }
}
