//! Defines the [`WikiPage`] and [`Version`] types and the [`PageStore`]
//! trait through which the build reads them, plus [`GitWiki`], the store
//! backed by a git repository of wiki pages.
//!
//! Pages are read from the tree committed at `HEAD`, not from the working
//! directory, and history comes from `git log`. The `git` executable must be
//! on the `PATH`.

use crate::markdown::{Error as MarkdownError, Renderer};
use chrono::{DateTime, FixedOffset};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use url::Url;

/// The markup a page is written in. Only Markdown pages are converted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageFormat {
    Markdown,

    /// Another wiki markup, identified by its file extension.
    Other(String),
}

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "mdown", "mkdn", "mkd"];

const OTHER_EXTENSIONS: &[&str] = &[
    "textile",
    "rdoc",
    "org",
    "creole",
    "rst",
    "asciidoc",
    "adoc",
    "mediawiki",
    "wiki",
    "pod",
    "txt",
];

impl PageFormat {
    /// Returns the format for a file extension, or `None` if files with that
    /// extension aren't wiki pages at all.
    pub fn from_extension(extension: &str) -> Option<PageFormat> {
        let extension = extension.to_ascii_lowercase();
        if MARKDOWN_EXTENSIONS.contains(&extension.as_str()) {
            Some(PageFormat::Markdown)
        } else if OTHER_EXTENSIONS.contains(&extension.as_str()) {
            Some(PageFormat::Other(extension))
        } else {
            None
        }
    }
}

/// A page of the wiki.
#[derive(Clone, Debug)]
pub struct WikiPage {
    /// The page's file name without its extension, e.g. `Getting-Started`.
    pub slug: String,

    /// The page's path within the repository.
    pub path: String,

    pub format: PageFormat,

    /// The page's source text.
    pub raw_data: String,

    /// The page rendered to HTML. Empty for non-Markdown pages.
    pub formatted_data: String,
}

impl WikiPage {
    /// The page's plain-text body. Wiki pages are plain text already, so
    /// this is the source text.
    pub fn text_data(&self) -> &str {
        &self.raw_data
    }
}

/// A commit that touched a page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Version {
    /// The commit hash.
    pub id: String,

    /// When the commit was authored, in the author's timezone.
    pub authored_date: DateTime<FixedOffset>,

    pub author_name: String,
}

/// Selects which part of a page's history [`PageStore::versions`] returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Whether to follow the page across renames.
    pub follow_renames: bool,

    /// The maximum number of versions to return.
    pub limit: usize,
}

impl HistoryQuery {
    /// Large enough to be the whole history of any realistic wiki page.
    pub const FULL_HISTORY_LIMIT: usize = 100_000;

    /// The complete history of a page, following renames.
    pub fn full() -> HistoryQuery {
        HistoryQuery {
            follow_renames: true,
            limit: Self::FULL_HISTORY_LIMIT,
        }
    }
}

/// Read access to the wiki's pages and their history.
pub trait PageStore {
    /// Returns every page of the wiki.
    fn pages(&self) -> Result<Vec<WikiPage>>;

    /// Returns the versions of `page`, newest first. When following renames,
    /// the last element is the oldest commit reachable through the page's
    /// rename history.
    fn versions(&self, page: &WikiPage, query: &HistoryQuery) -> Result<Vec<Version>>;

    /// Returns the footer shown on every page, if the wiki has one.
    fn footer(&self) -> Result<Option<WikiPage>>;
}

/// A [`PageStore`] reading a git repository through the `git` executable.
pub struct GitWiki {
    repository: PathBuf,
    home_url: Url,
}

const FOOTER_NAME: &str = "_Footer";

// Commit fields are separated by the ASCII unit separator, which can't
// appear in hashes, dates or (sanely) author names.
const LOG_FORMAT: &str = "--format=%H%x1f%aI%x1f%an";

impl GitWiki {
    /// Opens the wiki in `repository`. `home_url` is the base URL for
    /// internal links between pages.
    pub fn open(repository: &Path, home_url: &Url) -> Result<GitWiki> {
        let wiki = GitWiki {
            repository: repository.to_owned(),
            home_url: home_url.clone(),
        };
        wiki.git(&["rev-parse", "--verify", "HEAD"])?;
        Ok(wiki)
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repository)
            .args(args)
            .output()
            .map_err(|err| Error::Spawn {
                repository: self.repository.clone(),
                err,
            })?;
        if !output.status.success() {
            return Err(Error::Git {
                args: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        String::from_utf8(output.stdout).map_err(|_| Error::NotUtf8(args.join(" ")))
    }

    /// Lists the page files at `HEAD` as `(path, slug, format)` triples.
    /// Files whose name starts with `_` (footer, sidebar, ...) are wiki
    /// chrome and are left out.
    fn page_files(&self) -> Result<Vec<(String, String, PageFormat)>> {
        let listing = self.git(&["ls-tree", "-r", "-z", "--name-only", "HEAD"])?;
        Ok(listing
            .split('\0')
            .filter_map(|path| {
                let (slug, format) = split_file_name(path)?;
                match slug.starts_with('_') {
                    true => None,
                    false => Some((path.to_owned(), slug.to_owned(), format)),
                }
            })
            .collect())
    }

    fn renderer(&self, files: &[(String, String, PageFormat)]) -> Result<Renderer> {
        let mut pages = HashMap::new();
        for (path, slug, _) in files {
            if pages.insert(slug.clone(), file_name(path).to_owned()).is_some() {
                return Err(Error::DuplicateSlug(slug.clone()));
            }
        }
        Ok(Renderer::new(&self.home_url, pages))
    }

    fn load(
        &self,
        renderer: &Renderer,
        path: &str,
        slug: &str,
        format: PageFormat,
    ) -> Result<WikiPage> {
        let raw_data = self.git(&["cat-file", "blob", &format!("HEAD:{}", path)])?;
        let formatted_data = match format {
            PageFormat::Markdown => renderer
                .to_html(&raw_data)
                .map_err(|err| Error::Render {
                    slug: slug.to_owned(),
                    err,
                })?,
            PageFormat::Other(_) => String::new(),
        };
        Ok(WikiPage {
            slug: slug.to_owned(),
            path: path.to_owned(),
            format,
            raw_data,
            formatted_data,
        })
    }
}

impl PageStore for GitWiki {
    fn pages(&self) -> Result<Vec<WikiPage>> {
        let files = self.page_files()?;
        let renderer = self.renderer(&files)?;
        files
            .into_iter()
            .map(|(path, slug, format)| self.load(&renderer, &path, &slug, format))
            .collect()
    }

    fn versions(&self, page: &WikiPage, query: &HistoryQuery) -> Result<Vec<Version>> {
        let limit = format!("--max-count={}", query.limit);
        let mut args = vec!["log", LOG_FORMAT, limit.as_str()];
        if query.follow_renames {
            args.push("--follow");
        }
        args.extend(["HEAD", "--", page.path.as_str()]);
        parse_log(&self.git(&args)?)
    }

    fn footer(&self) -> Result<Option<WikiPage>> {
        let files = self.page_files()?;
        let listing = self.git(&["ls-tree", "-z", "--name-only", "HEAD"])?;
        let footer = listing.split('\0').find(|path| {
            matches!(
                split_file_name(path),
                Some((FOOTER_NAME, PageFormat::Markdown))
            )
        });
        match footer {
            None => Ok(None),
            Some(path) => {
                let renderer = self.renderer(&files)?;
                self.load(&renderer, path, FOOTER_NAME, PageFormat::Markdown)
                    .map(Some)
            }
        }
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Splits the file name at the end of `path` into slug and page format.
/// Returns `None` for files that aren't pages.
fn split_file_name(path: &str) -> Option<(&str, PageFormat)> {
    let (slug, extension) = file_name(path).rsplit_once('.')?;
    if slug.is_empty() {
        return None;
    }
    Some((slug, PageFormat::from_extension(extension)?))
}

/// Parses `git log` output produced with [`LOG_FORMAT`].
fn parse_log(log: &str) -> Result<Vec<Version>> {
    log.lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut fields = line.splitn(3, '\x1f');
            match (fields.next(), fields.next(), fields.next()) {
                (Some(id), Some(date), Some(author_name)) => Ok(Version {
                    id: id.to_owned(),
                    authored_date: DateTime::parse_from_rfc3339(date).map_err(
                        |err| Error::Date {
                            date: date.to_owned(),
                            err,
                        },
                    )?,
                    author_name: author_name.to_owned(),
                }),
                _ => Err(Error::LogLine(line.to_owned())),
            }
        })
        .collect()
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for reading the wiki.
#[derive(Debug)]
pub enum Error {
    /// Returned when the `git` executable can't be run.
    Spawn {
        repository: PathBuf,
        err: std::io::Error,
    },

    /// Returned when a git command exits unsuccessfully.
    Git { args: String, stderr: String },

    /// Returned when git output (e.g. a page's content) isn't UTF-8.
    NotUtf8(String),

    /// Returned when a `git log` line doesn't have the expected fields.
    LogLine(String),

    /// Returned when a commit date can't be parsed.
    Date {
        date: String,
        err: chrono::ParseError,
    },

    /// Returned when two pages share a slug and would overwrite each
    /// other's output.
    DuplicateSlug(String),

    /// Returned when a page's Markdown can't be rendered.
    Render { slug: String, err: MarkdownError },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Spawn { repository, err } => write!(
                f,
                "Running git in '{}': {}",
                repository.display(),
                err
            ),
            Error::Git { args, stderr } => {
                write!(f, "`git {}` failed: {}", args, stderr)
            }
            Error::NotUtf8(args) => {
                write!(f, "Output of `git {}` is not valid UTF-8", args)
            }
            Error::LogLine(line) => write!(f, "Unexpected git log line: {:?}", line),
            Error::Date { date, err } => {
                write!(f, "Parsing commit date '{}': {}", date, err)
            }
            Error::DuplicateSlug(slug) => {
                write!(f, "More than one page has the slug '{}'", slug)
            }
            Error::Render { slug, err } => {
                write!(f, "Rendering page '{}': {}", slug, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Spawn { repository: _, err } => Some(err),
            Error::Date { date: _, err } => Some(err),
            Error::Render { slug: _, err } => Some(err),
            _ => None,
        }
    }
}
