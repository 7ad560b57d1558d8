//! RSS/Atom feed detection without parsing

use std::sync::Arc;

use newsline_core::{
    ClueTable, ContentSniffer, ErrorSource, ItemOutput, Metadata, ParseFilters, ParseResult,
    Status, StatusRecord, WorkItem, error_record, keys,
};

use crate::config::FeedConfig;

/// Content-Type substrings identifying a feed
pub const MIME_TYPE_CLUES: &[&str] = &["rss+xml", "atom+xml", "text/rss"];

pub const CONTENT_CLUES: &[&str] = &["<rss", "<feed", "http://www.w3.org/2005/Atom"];

/// Detects syndication feeds by flag, content type or content clues.
///
/// Detected feeds are not parsed: the parse filters run and the item is
/// acknowledged as fetched.
#[derive(Debug, Clone)]
pub struct FeedClassifier {
    sniffer: ContentSniffer,
    filters: ParseFilters,
}

impl FeedClassifier {
    pub fn new(config: &FeedConfig, filters: ParseFilters) -> Self {
        let clues = Arc::new(ClueTable::any_of(CONTENT_CLUES.iter().copied()));
        Self {
            sniffer: ContentSniffer::new(clues, config.max_offset_guess),
            filters,
        }
    }

    /// True if the item is a feed; sets `isFeed` when this call detected it.
    pub fn classify(&self, url: &str, content: &[u8], metadata: &mut Metadata) -> bool {
        if metadata.flag(keys::IS_FEED) {
            return true;
        }

        if let Some(ct) = metadata.get_first(keys::CONTENT_TYPE) {
            if MIME_TYPE_CLUES.iter().any(|clue| ct.contains(clue)) {
                log::info!("Feed detected from content type <{ct}> for {url}");
                metadata.set_flag(keys::IS_FEED, true);
                return true;
            }
        }

        if self.sniffer.matches(content) {
            log::info!("Feed detected from content: {url}");
            metadata.set_flag(keys::IS_FEED, true);
            return true;
        }
        false
    }

    pub fn process(&self, item: WorkItem) -> ItemOutput {
        let WorkItem {
            url,
            content,
            mut metadata,
        } = item;

        if !self.classify(&url, &content, &mut metadata) {
            return ItemOutput::PassThrough(WorkItem::new(url, content, metadata));
        }

        let mut parse = ParseResult::new(metadata, Vec::new());
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
        ItemOutput::terminal(StatusRecord::new(url, parse.metadata, Status::Fetched))
    }
}
