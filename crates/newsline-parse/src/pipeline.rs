//! Per-item chain: sitemap resolver, then feed classifier, else page

use std::fmt;

use chrono::{DateTime, Utc};
use newsline_core::{
    ConfigError, FiltersConfig, ItemOutput, OutlinkFactory, OutlinksConfig, ParseFilters, Status,
    WorkItem, keys,
};

use crate::config::{FeedConfig, SitemapConfig};
use crate::feed::FeedClassifier;
use crate::sitemap::SitemapResolver;

/// What the pipeline made of a document, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentKind {
    Page,
    Sitemap,
    NewsSitemap,
    SitemapIndex,
    Feed,
    Error,
}

impl DocumentKind {
    pub fn of(output: &ItemOutput) -> Self {
        let record = match output {
            ItemOutput::PassThrough(_) => return Self::Page,
            ItemOutput::Terminal { record, .. } => record,
        };
        let md = &record.metadata;
        if record.status == Status::Error {
            Self::Error
        } else if md.flag(keys::IS_FEED) {
            Self::Feed
        } else if md.flag(keys::IS_SITEMAP_INDEX) {
            Self::SitemapIndex
        } else if md.flag(keys::IS_SITEMAP_NEWS) {
            Self::NewsSitemap
        } else {
            Self::Sitemap
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Sitemap => "sitemap",
            Self::NewsSitemap => "news sitemap",
            Self::SitemapIndex => "sitemap index",
            Self::Feed => "feed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, immutable classification chain; safe to use from many workers.
#[derive(Debug, Clone)]
pub struct ParsePipeline {
    sitemaps: SitemapResolver,
    feeds: FeedClassifier,
}

impl ParsePipeline {
    pub fn new(sitemaps: SitemapResolver, feeds: FeedClassifier) -> Self {
        Self { sitemaps, feeds }
    }

    pub fn from_config(
        sitemap: &SitemapConfig,
        feed: &FeedConfig,
        outlinks: &OutlinksConfig,
        filters: &FiltersConfig,
    ) -> Result<Self, ConfigError> {
        let filters = ParseFilters::from_config(filters)?;
        let outlinks = OutlinkFactory::from_config(outlinks)?;
        Ok(Self::new(
            SitemapResolver::new(sitemap.clone(), outlinks, filters.clone()),
            FeedClassifier::new(feed, filters),
        ))
    }

    pub fn process(&self, item: WorkItem) -> ItemOutput {
        self.process_at(item, Utc::now())
    }

    pub fn process_at(&self, item: WorkItem, now: DateTime<Utc>) -> ItemOutput {
        match self.sitemaps.process_at(item, now) {
            ItemOutput::PassThrough(item) => self.feeds.process(item),
            handled => handled,
        }
    }
}
