//! Writes the `sitemap.xml` document.

use crate::site::PageSummary;
use crate::util::escape_html;
use std::io::{self, Write};
use url::Url;

/// Writes a sitemap listing `site_url` followed by `pages` in the given
/// order, each with its last-modified time.
pub fn write_sitemap<W: Write>(site_url: &Url, pages: &[&PageSummary], mut w: W) -> io::Result<()> {
    write!(
        w,
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n  \
         <url>\n    \
         <loc>{}</loc>\n  \
         </url>\n",
        escape_html(site_url.as_str())
    )?;
    for page in pages {
        write!(
            w,
            "  <url>\n    \
             <loc>{}</loc>\n    \
             <lastmod>{}</lastmod>\n  \
             </url>\n",
            escape_html(page.canonical_url.as_str()),
            escape_html(&page.modified_iso),
        )?;
    }
    w.write_all(b"</urlset>")?;
    w.flush()
}
