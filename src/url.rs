//! Helpers for deriving page URLs from the configured base URLs. Every base
//! URL (site, wiki, home, mirror repository) is treated as a directory, so a
//! child is formed by ensuring a trailing slash and appending one
//! percent-encoded path segment per component.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;
use url::Url;

/// Everything but `A-Z a-z 0-9 * - . _` is encoded, so sub-delimiters such
/// as `&`, `'` and `(` can't end up bare in a page URL.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'*')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_');

/// Returns a copy of `base` whose path ends in `/`.
pub fn ensure_trailing_slash(base: &Url) -> Url {
    let mut url = base.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Appends `segments` to `base` as path segments. Each segment is
/// percent-encoded on its own, so a slug containing `/`, `?`, `#` or spaces
/// stays a single segment.
pub fn child<S: AsRef<str>>(base: &Url, segments: &[S]) -> Result<Url> {
    if base.cannot_be_a_base() {
        return Err(Error::CannotBeABase(base.clone()));
    }
    let mut url = ensure_trailing_slash(base);
    let mut path = url.path().to_owned();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            path.push('/');
        }
        path.extend(utf8_percent_encode(segment.as_ref(), SEGMENT));
    }
    url.set_path(&path);
    Ok(url)
}

type Result<T> = std::result::Result<T, Error>;

/// Returned when a base URL can't have path segments appended to it.
#[derive(Debug)]
pub enum Error {
    /// The base URL is something like `mailto:` or `data:`.
    CannotBeABase(Url),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::CannotBeABase(url) => {
                write!(f, "URL `{}` can't be used as a base URL", url)
            }
        }
    }
}

impl std::error::Error for Error {}
