//! Parsed sitemap documents

use chrono::{DateTime, Utc};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFrequency {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFrequency {
    pub fn parse(value: &str) -> Option<Self> {
        let freq = match value.trim().to_ascii_lowercase().as_str() {
            "always" => Self::Always,
            "hourly" => Self::Hourly,
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "monthly" => Self::Monthly,
            "yearly" => Self::Yearly,
            "never" => Self::Never,
            _ => return None,
        };
        Some(freq)
    }
}

/// `<news:news>` block of a URL entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewsAttributes {
    pub publication_date: Option<DateTime<Utc>>,
    pub title: Option<String>,
}

/// `<xhtml:link rel="alternate" hreflang=".." href=".."/>`
#[derive(Debug, Clone, PartialEq)]
pub struct AlternateLink {
    pub hreflang: Option<String>,
    pub href: Url,
}

/// One `<url>` of a urlset or `<sitemap>` of an index.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub loc: Url,
    pub last_modified: Option<DateTime<Utc>>,
    pub priority: Option<f32>,
    pub change_frequency: Option<ChangeFrequency>,
    pub news: Vec<NewsAttributes>,
    pub alternates: Vec<AlternateLink>,
}

impl SitemapEntry {
    pub fn new(loc: Url) -> Self {
        Self {
            loc,
            last_modified: None,
            priority: None,
            change_frequency: None,
            news: Vec::new(),
            alternates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapKind {
    /// `<sitemapindex>`: entries are child sitemaps
    Index,
    /// `<urlset>` or a plain-text URL list
    UrlSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSitemap {
    pub kind: SitemapKind,
    pub entries: Vec<SitemapEntry>,
    /// Parsing stopped early at an XML error
    pub partial: bool,
}

impl ParsedSitemap {
    pub fn new(kind: SitemapKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            partial: false,
        }
    }

    pub fn is_index(&self) -> bool {
        self.kind == SitemapKind::Index
    }
}
