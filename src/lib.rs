//! The library code for the `wikistatic` static site generator. It converts
//! the Markdown pages of a git-backed wiki into a static HTML site. The
//! architecture can be generally broken down into three steps:
//!
//! 1. Reading pages and their version history from the wiki repository
//!    ([`crate::wiki`])
//! 2. Resolving each page's publication metadata from its history
//!    ([`crate::metadata`])
//! 3. Rendering article pages, the home page and the sitemap to disk
//!    ([`crate::write`], [`crate::sitemap`])
//!
//! The third step depends on all article pages having been resolved, because
//! the home page lists every article and the sitemap orders them by
//! modification date ([`crate::site`]).
//!
//! [`crate::build`] ties the steps together.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod links;
pub mod markdown;
pub mod math;
pub mod metadata;
pub mod site;
pub mod sitemap;
pub mod url;
pub mod util;
pub mod wiki;
pub mod write;
