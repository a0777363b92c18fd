//! Derives a page's publication metadata from its version history. A page is
//! published when its oldest version (following renames) was authored, by
//! that version's author; it was modified when its newest version was
//! authored, if that's a different commit.

use crate::config::Config;
use crate::url::{child, Error as UrlError};
use crate::wiki::Version;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use std::fmt;
use url::Url;

/// A point in time in the forms the templates need.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timestamp {
    pub utc: DateTime<Utc>,

    /// ISO 8601, e.g. `2024-03-05T09:00:00Z`.
    pub iso: String,

    /// Formatted with the configured display format.
    pub display: String,
}

impl Timestamp {
    fn new(authored_date: &DateTime<FixedOffset>, display_format: &str) -> Timestamp {
        let utc = authored_date.with_timezone(&Utc);
        Timestamp {
            iso: utc.to_rfc3339_opts(SecondsFormat::Secs, true),
            display: utc.format(display_format).to_string(),
            utc,
        }
    }
}

/// Everything about a page that comes from its slug and its history.
#[derive(Clone, Debug)]
pub struct PageMetadata {
    pub slug: String,

    /// The slug with hyphens replaced by spaces. Not escaped.
    pub title: String,

    /// The page's URL on the static site.
    pub canonical_url: Url,

    /// The page's URL on the wiki.
    pub wiki_page_url: Url,

    pub published: Timestamp,

    /// `None` unless the newest version differs from the oldest one. Read
    /// through [`PageMetadata::modified`].
    modified: Option<Timestamp>,

    /// The name of the page's original author.
    pub author_name: String,

    /// The oldest commit in the mirror repository.
    pub author_url: Url,
}

impl PageMetadata {
    /// Resolves the metadata for the page `slug` from `versions`, which must
    /// be its history newest first, following renames.
    pub fn resolve(slug: &str, versions: &[Version], config: &Config) -> Result<PageMetadata> {
        let (newest, oldest) = match (versions.first(), versions.last()) {
            (Some(newest), Some(oldest)) => (newest, oldest),
            _ => return Err(Error::NoHistory(slug.to_owned())),
        };

        let published = Timestamp::new(&oldest.authored_date, &config.display_date_format);
        let modified = match newest.id != oldest.id {
            true => Some(Timestamp::new(&newest.authored_date, &config.display_date_format)),
            false => None,
        };

        let url = |base: &Url, segments: &[&str]| {
            child(base, segments).map_err(|err| Error::Url {
                slug: slug.to_owned(),
                err,
            })
        };

        Ok(PageMetadata {
            slug: slug.to_owned(),
            title: slug.replace('-', " "),
            canonical_url: url(&config.site_url, &[slug])?,
            wiki_page_url: url(&config.wiki_url, &[slug])?,
            published,
            modified,
            author_name: oldest.author_name.clone(),
            author_url: url(&config.mirror_repository_url, &["commit", oldest.id.as_str()])?,
        })
    }

    /// Whether the page changed after it was published.
    pub fn is_modified(&self) -> bool {
        self.modified.is_some()
    }

    /// When the page was last modified. For unmodified pages this is the
    /// publication timestamp itself.
    pub fn modified(&self) -> &Timestamp {
        self.modified.as_ref().unwrap_or(&self.published)
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Returned when a page's metadata can't be derived. Every published page
/// needs a date and an author, so these are fatal.
#[derive(Debug)]
pub enum Error {
    /// The page has no versions.
    NoHistory(String),

    /// One of the page's URLs can't be built.
    Url { slug: String, err: UrlError },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NoHistory(slug) => write!(f, "Page '{}' has no history", slug),
            Error::Url { slug, err } => {
                write!(f, "Building URLs for page '{}': {}", slug, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::NoHistory(_) => None,
            Error::Url { slug: _, err } => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::test::example;

    fn version(id: &str, date: &str, author_name: &str) -> Version {
        Version {
            id: id.to_owned(),
            authored_date: match DateTime::parse_from_rfc3339(date) {
                Ok(date) => date,
                Err(e) => panic!("bad test date {}: {}", date, e),
            },
            author_name: author_name.to_owned(),
        }
    }

    #[test]
    fn test_single_version() -> Result<()> {
        let versions = [version("a1", "2024-03-05T10:00:00+01:00", "Alice")];
        let metadata = PageMetadata::resolve("Getting-Started", &versions, &example())?;

        assert!(!metadata.is_modified());
        assert_eq!(&metadata.published, metadata.modified());
        assert!(std::ptr::eq(&metadata.published, metadata.modified()));
        assert_eq!("2024-03-05T09:00:00Z", metadata.published.iso);
        assert_eq!("March 5, 2024", metadata.published.display);
        Ok(())
    }

    #[test]
    fn test_modified() -> Result<()> {
        let versions = [
            version("c3", "2024-06-01T08:00:00-07:00", "Carol"),
            version("b2", "2024-04-01T12:00:00Z", "Bob"),
            version("a1", "2024-03-05T10:00:00+01:00", "Alice"),
        ];
        let metadata = PageMetadata::resolve("Getting-Started", &versions, &example())?;

        assert!(metadata.is_modified());
        assert!(metadata.modified().utc >= metadata.published.utc);
        assert_eq!("2024-06-01T15:00:00Z", metadata.modified().iso);
        assert_eq!("June 1, 2024", metadata.modified().display);
        assert_eq!("2024-03-05T09:00:00Z", metadata.published.iso);
        Ok(())
    }

    #[test]
    fn test_renamed_page_attributed_to_original_author() -> Result<()> {
        // Newest first: the rename commit, then the commit that created the
        // page under its old name.
        let versions = [
            version("rename", "2024-05-01T00:00:00Z", "Bob"),
            version("created", "2023-01-15T00:00:00Z", "Alice"),
        ];
        let metadata = PageMetadata::resolve("New-Name", &versions, &example())?;

        assert_eq!("Alice", metadata.author_name);
        assert_eq!(
            "https://github.com/acme/widgets-wiki/commit/created",
            metadata.author_url.as_str()
        );
        assert_eq!("2023-01-15T00:00:00Z", metadata.published.iso);
        assert_eq!("2024-05-01T00:00:00Z", metadata.modified().iso);
        Ok(())
    }

    #[test]
    fn test_urls_and_title() -> Result<()> {
        let versions = [version("a1", "2024-03-05T10:00:00Z", "Alice")];
        let metadata = PageMetadata::resolve("C#-Tips-&-Tricks", &versions, &example())?;

        assert_eq!("C# Tips & Tricks", metadata.title);
        assert_eq!(
            "https://wiki.acme.example/C%23-Tips-%26-Tricks",
            metadata.canonical_url.as_str()
        );
        assert_eq!(
            "https://github.com/acme/widgets/wiki/C%23-Tips-%26-Tricks",
            metadata.wiki_page_url.as_str()
        );
        Ok(())
    }

    #[test]
    fn test_no_history() {
        assert!(matches!(
            PageMetadata::resolve("Orphan", &[], &example()),
            Err(Error::NoHistory(_))
        ));
    }
}
