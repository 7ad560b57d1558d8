//! Newsline Parse - document classification and sitemap resolution
//!
//! A fetched document runs through [`ParsePipeline`]: sitemaps are
//! classified and, where worthwhile, parsed into discovered links; feeds are
//! recognised without parsing; everything else passes through as a page.

pub mod config;
pub mod feed;
pub mod pipeline;
pub mod sitemap;

pub use config::{FeedConfig, SitemapConfig};
pub use feed::FeedClassifier;
pub use pipeline::{DocumentKind, ParsePipeline};
pub use sitemap::{ParseError, SitemapParser, SitemapResolver};
