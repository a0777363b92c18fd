//! Collects a [`PageSummary`] per article page and orders them for the home
//! page listing ([`by_published_descending`]) and the sitemap
//! ([`by_modified_descending`]).

use crate::metadata::PageMetadata;
use crate::url::{child, Error as UrlError};
use crate::wiki::{PageFormat, WikiPage};
use chrono::{DateTime, Utc};
use url::Url;

/// Pages that are part of the wiki's furniture rather than articles. They
/// never get an output file or a listing entry.
pub const RESERVED_SLUGS: &[&str] = &["Home", "LICENSE", "README"];

/// Whether `slug` is one of [`RESERVED_SLUGS`].
pub fn is_reserved(slug: &str) -> bool {
    RESERVED_SLUGS.contains(&slug)
}

/// Whether `page` is converted into an article: it must be Markdown and must
/// not have a reserved slug.
pub fn is_article(page: &WikiPage) -> bool {
    page.format == PageFormat::Markdown && !is_reserved(&page.slug)
}

/// What the home page and the sitemap need to know about an article.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageSummary {
    /// The page title. Not escaped.
    pub title: String,

    /// The page's URL under the home URL.
    pub url: Url,

    pub canonical_url: Url,
    pub published: DateTime<Utc>,
    pub published_iso: String,

    /// The publication date in the configured display format.
    pub published_display: String,

    pub modified: DateTime<Utc>,
    pub modified_iso: String,
}

impl PageSummary {
    /// Summarizes a page from its metadata. `home_url` is the base for the
    /// summary's `url`.
    pub fn new(metadata: &PageMetadata, home_url: &Url) -> Result<PageSummary, UrlError> {
        Ok(PageSummary {
            title: metadata.title.clone(),
            url: child(home_url, &[&metadata.slug])?,
            canonical_url: metadata.canonical_url.clone(),
            published: metadata.published.utc,
            published_iso: metadata.published.iso.clone(),
            published_display: metadata.published.display.clone(),
            modified: metadata.modified().utc,
            modified_iso: metadata.modified().iso.clone(),
        })
    }
}

/// Summaries in the order the pages were encountered.
#[derive(Default)]
pub struct SiteIndex {
    summaries: Vec<PageSummary>,
}

impl SiteIndex {
    pub fn push(&mut self, summary: PageSummary) {
        self.summaries.push(summary);
    }

    pub fn summaries(&self) -> &[PageSummary] {
        &self.summaries
    }
}

/// The home page listing: summaries whose title doesn't start with
/// `site_name`, newest publication first. Pages published at the same
/// instant keep their encounter order.
pub fn by_published_descending<'a>(
    summaries: &'a [PageSummary],
    site_name: &str,
) -> Vec<&'a PageSummary> {
    let mut listing: Vec<&PageSummary> = summaries
        .iter()
        .filter(|summary| !summary.title.starts_with(site_name))
        .collect();
    // `sort_by` is stable.
    listing.sort_by(|a, b| b.published.cmp(&a.published));
    listing
}

/// The sitemap order: every summary, most recently modified first. Pages
/// modified at the same instant keep their encounter order.
pub fn by_modified_descending(summaries: &[PageSummary]) -> Vec<&PageSummary> {
    let mut listing: Vec<&PageSummary> = summaries.iter().collect();
    listing.sort_by(|a, b| b.modified.cmp(&a.modified));
    listing
}
