//! Sitemap resolution: classify, parse, filter by recency and emit child links

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use newsline_core::{
    ErrorSource, ItemOutput, Metadata, Outlink, OutlinkFactory, ParseFilters, ParseResult,
    Status, StatusRecord, WorkItem, error_record, keys,
};
use url::Url;

use super::classifier::{SitemapClassifier, SitemapFlags};
use super::model::{ParsedSitemap, SitemapEntry};
use super::namespace::SitemapClues;
use super::parser::{SitemapParser, content_prefix};
use crate::config::SitemapConfig;

/// Resolves news sitemaps, sitemap indexes and verified sitemaps into
/// discovered links. Other sitemaps are only acknowledged, non-sitemaps pass
/// through untouched.
#[derive(Debug, Clone)]
pub struct SitemapResolver {
    config: SitemapConfig,
    classifier: SitemapClassifier,
    parser: SitemapParser,
    outlinks: OutlinkFactory,
    filters: ParseFilters,
}

impl SitemapResolver {
    pub fn new(config: SitemapConfig, outlinks: OutlinkFactory, filters: ParseFilters) -> Self {
        Self::with_clues(config, SitemapClues::standard(), outlinks, filters)
    }

    pub fn with_clues(
        config: SitemapConfig,
        clues: SitemapClues,
        outlinks: OutlinkFactory,
        filters: ParseFilters,
    ) -> Self {
        Self {
            classifier: SitemapClassifier::new(clues, config.max_offset_guess),
            parser: SitemapParser::new(config.allow_partial),
            config,
            outlinks,
            filters,
        }
    }

    pub fn process(&self, item: WorkItem) -> ItemOutput {
        self.process_at(item, Utc::now())
    }

    /// [`process`](Self::process) with an explicit reference time for the recency filter
    pub fn process_at(&self, item: WorkItem, now: DateTime<Utc>) -> ItemOutput {
        let WorkItem {
            url,
            content,
            mut metadata,
        } = item;
        let mut flags = SitemapFlags::from_metadata(&metadata);

        if self.config.sniff_content {
            let prefix = content_prefix(&content, self.config.max_offset_guess);
            if let Some(detected) = self.classifier.detect(&url, &prefix) {
                flags.reconcile(detected, &mut metadata);
            }
        }

        if !flags.needs_parsing() {
            if flags.sitemap {
                return ItemOutput::terminal(StatusRecord::new(url, metadata, Status::Fetched));
            }
            return ItemOutput::PassThrough(WorkItem::new(url, content, metadata));
        }

        // keeps the default sitemap interval off news sitemaps, indexes and verified sitemaps
        metadata.remove(keys::IS_SITEMAP);

        let source = match Url::parse(&url) {
            Ok(u) => u,
            Err(e) => return parse_failure(&url, metadata, &e),
        };
        let content_type = metadata.get_first(keys::CONTENT_TYPE).map(str::to_owned);
        let sitemap = match self.parser.parse(&url, &content, content_type.as_deref()) {
            Ok(s) => s,
            Err(e) => return parse_failure(&url, metadata, &e),
        };

        let outlinks = if sitemap.is_index() {
            self.index_links(&source, &sitemap, &metadata, now)
        } else {
            self.urlset_links(&source, &sitemap, &metadata, now)
        };

        let mut parse = ParseResult::new(metadata, outlinks);
        if let Err(e) = self.filters.filter(&url, &content, &mut parse) {
            let message = format!("Exception while running parse filters on {url}: {e}");
            log::error!("{message}");
            return ItemOutput::terminal(error_record(
                &url,
                parse.metadata,
                ErrorSource::ContentFiltering,
                message,
            ));
        }

        let ParseResult {
            mut metadata,
            mut outlinks,
        } = parse;
        if sitemap.is_index() {
            metadata.set_flag(keys::IS_SITEMAP_INDEX, true);
            for ol in &mut outlinks {
                ol.metadata.set_flag(keys::IS_SITEMAP, true);
                if flags.verified {
                    ol.metadata.set_flag(keys::IS_SITEMAP_VERIFIED, true);
                }
            }
        } else {
            metadata.remove(keys::IS_SITEMAP_INDEX);
        }

        metadata.set_value(keys::NUM_LINKS, outlinks.len().to_string());
        ItemOutput::Terminal {
            record: StatusRecord::new(url, metadata, Status::Fetched),
            discovered: outlinks,
        }
    }

    /// Keep iff the date is absent or within the configured window before `now`
    fn recently_modified(&self, date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let hours = self.config.filter_hours_since_modified;
        let (Some(date), true) = (date, hours >= 0) else {
            return true;
        };
        match TimeDelta::try_hours(hours).and_then(|d| now.checked_sub_signed(d)) {
            Some(cutoff) => date >= cutoff,
            None => true,
        }
    }

    fn index_links(
        &self,
        source: &Url,
        sitemap: &ParsedSitemap,
        parent: &Metadata,
        now: DateTime<Utc>,
    ) -> Vec<Outlink> {
        let step = self.config.schedule_delay_minutes;
        let mut delay = 0;
        let mut skipped = 0;
        let mut links = Vec::new();

        for entry in &sitemap.entries {
            let target = entry.loc.as_str();
            if !self.recently_modified(entry.last_modified, now) {
                skipped += 1;
                log::debug!(
                    "{target} has a modified date {} which is more than {} hours old",
                    DisplayDate(entry.last_modified),
                    self.config.filter_hours_since_modified
                );
                continue;
            }

            let tags = [(keys::IS_SITEMAP, "true"), (keys::IS_SITEMAP_NEWS, "false")];
            let Some(mut ol) = self.outlinks.outlink(source, target, parent, &tags) else {
                continue;
            };
            if step > 0 {
                if delay > 0 {
                    ol.metadata.set_value(keys::DELAY, delay.to_string());
                }
                delay += step;
            }
            log::debug!("{source} : [sitemap] {target}");
            links.push(ol);
        }

        log::info!(
            "Sitemap index (found {} sitemaps, {skipped} skipped): {source}",
            sitemap.entries.len()
        );
        links
    }

    fn urlset_links(
        &self,
        source: &Url,
        sitemap: &ParsedSitemap,
        parent: &Metadata,
        now: DateTime<Utc>,
    ) -> Vec<Outlink> {
        let tags = [(keys::IS_SITEMAP, "false"), (keys::IS_SITEMAP_NEWS, "false")];
        let mut skipped = 0;
        let mut links = Vec::new();

        for entry in &sitemap.entries {
            let target = entry.loc.as_str();
            if !self.entry_is_recent(entry, now) {
                skipped += 1;
                continue;
            }

            // alternate-language versions, except those pointing back to the entry itself
            for alt in &entry.alternates {
                if alt.href.as_str() == target {
                    continue;
                }
                links.extend(self.outlinks.outlink(source, alt.href.as_str(), parent, &tags));
            }

            if let Some(ol) = self.outlinks.outlink(source, target, parent, &tags) {
                log::debug!("{source} : [sitemap] {target}");
                links.push(ol);
            }
        }

        log::info!(
            "Sitemap (found {} links, {skipped} skipped): {source}",
            sitemap.entries.len()
        );
        links
    }

    /// Recency of `lastmod` and of every news publication date
    fn entry_is_recent(&self, entry: &SitemapEntry, now: DateTime<Utc>) -> bool {
        let hours = self.config.filter_hours_since_modified;
        if !self.recently_modified(entry.last_modified, now) {
            log::debug!(
                "{} has a modified date {} which is more than {hours} hours old",
                entry.loc,
                DisplayDate(entry.last_modified)
            );
            return false;
        }
        let stale = entry
            .news
            .iter()
            .filter_map(|n| n.publication_date)
            .find(|d| !self.recently_modified(Some(*d), now));
        if let Some(date) = stale {
            log::debug!(
                "{} has a news publication date {date} which is more than {hours} hours old",
                entry.loc
            );
            return false;
        }
        true
    }
}

fn parse_failure(url: &str, metadata: Metadata, err: &dyn fmt::Display) -> ItemOutput {
    let message = format!("Exception while parsing {url}: {err}");
    log::error!("{message}");
    ItemOutput::terminal(error_record(
        url,
        metadata,
        ErrorSource::SitemapParsing,
        message,
    ))
}

struct DisplayDate(Option<DateTime<Utc>>);

impl fmt::Display for DisplayDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(d) => write!(f, "{}", d.to_rfc3339()),
            None => write!(f, "-"),
        }
    }
}
