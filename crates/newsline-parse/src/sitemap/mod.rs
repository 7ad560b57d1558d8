//! Sitemap classification, parsing and resolution

pub mod classifier;
pub mod date;
pub mod model;
pub mod namespace;
pub mod parser;
pub mod resolver;

pub use classifier::{SitemapClassifier, SitemapFlags, SitemapType};
pub use model::{
    AlternateLink, ChangeFrequency, NewsAttributes, ParsedSitemap, SitemapEntry, SitemapKind,
};
pub use namespace::SitemapClues;
pub use parser::{ParseError, SitemapParser};
pub use resolver::SitemapResolver;
