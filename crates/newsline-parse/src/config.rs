//! `[sitemap]` and `[feed]` configuration sections

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SitemapConfig {
    /// Classify sitemaps by content clues, not only by prior flags
    pub sniff_content: bool,
    /// Prefix length scanned for sitemap clues
    pub max_offset_guess: usize,
    /// Drop links last modified or published more than this many hours ago; -1 keeps all
    pub filter_hours_since_modified: i64,
    /// Minutes between the scheduled fetches of consecutive sub-sitemaps; <= 0 disables
    pub schedule_delay_minutes: i64,
    /// Keep entries parsed before an XML error
    pub allow_partial: bool,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            sniff_content: false,
            max_offset_guess: 1024,
            filter_hours_since_modified: -1,
            schedule_delay_minutes: -1,
            allow_partial: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub max_offset_guess: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_offset_guess: 512,
        }
    }
}
