//! XML namespaces of the sitemap protocol and its extensions

use std::sync::Arc;

use newsline_core::ClueTable;

pub const SITEMAP: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Non-standard sitemap namespaces still found in the wild
pub const SITEMAP_LEGACY: &[&str] = &[
    "https://www.sitemaps.org/schemas/sitemap/0.9",
    "http://www.sitemaps.org/schemas/sitemap/0.9/",
    "https://www.sitemaps.org/schemas/sitemap/0.9/",
    "http://www.google.com/schemas/sitemap/0.84",
    "https://www.google.com/schemas/sitemap/0.84",
    "http://www.google.com/schemas/sitemap/0.9",
    "https://www.google.com/schemas/sitemap/0.9",
    "http://www.google.com/schemas/sitemap/0.90",
    "https://www.google.com/schemas/sitemap/0.90",
];

pub const NEWS: &[&str] = &[
    "http://www.google.com/schemas/sitemap-news/0.9",
    "https://www.google.com/schemas/sitemap-news/0.9",
    "http://www.google.com/schemas/sitemap-news/0.84",
    "https://www.google.com/schemas/sitemap-news/0.84",
];

/// `xhtml:link` alternate-language extension
pub const LINKS: &str = "http://www.w3.org/1999/xhtml";

/// Namespace class of an element, as far as the parser cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NsKind {
    Sitemap,
    News,
    Links,
    Other,
}

impl NsKind {
    /// Classify a namespace URI; `None` is the empty namespace, accepted as sitemap.
    pub fn of(ns: Option<&[u8]>) -> Self {
        let Some(ns) = ns else {
            return Self::Sitemap;
        };
        if ns == SITEMAP.as_bytes() || SITEMAP_LEGACY.iter().any(|s| s.as_bytes() == ns) {
            Self::Sitemap
        } else if NEWS.iter().any(|s| s.as_bytes() == ns) {
            Self::News
        } else if ns == LINKS.as_bytes() {
            Self::Links
        } else {
            Self::Other
        }
    }
}

/// Sitemap clue table plus the index boundaries that map a match to a type.
///
/// Groups `0..news_end` are news namespaces, `news_end` is `<sitemapindex`,
/// everything after is a generic sitemap namespace.
#[derive(Debug, Clone)]
pub struct SitemapClues {
    pub table: Arc<ClueTable>,
    pub news_end: usize,
    pub index_end: usize,
}

impl SitemapClues {
    pub fn standard() -> Self {
        let clues = NEWS
            .iter()
            .copied()
            .chain(["<sitemapindex", SITEMAP])
            .chain(SITEMAP_LEGACY.iter().copied());
        Self {
            table: Arc::new(ClueTable::any_of(clues)),
            news_end: NEWS.len(),
            index_end: NEWS.len() + 1,
        }
    }
}
