//! Sitemap type detection from content clues and prior metadata flags

use newsline_core::{ContentSniffer, Metadata, keys};

use super::namespace::SitemapClues;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapType {
    News,
    Index,
    Sitemap,
}

/// Classification flags of one item, read from and written back to metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SitemapFlags {
    pub sitemap: bool,
    pub news: bool,
    pub index: bool,
    pub verified: bool,
}

impl SitemapFlags {
    pub fn from_metadata(md: &Metadata) -> Self {
        Self {
            sitemap: md.flag(keys::IS_SITEMAP),
            news: md.flag(keys::IS_SITEMAP_NEWS),
            index: md.flag(keys::IS_SITEMAP_INDEX),
            verified: md.flag(keys::IS_SITEMAP_VERIFIED),
        }
    }

    /// Only news sitemaps, indexes and verified sitemaps are parsed for links
    pub fn needs_parsing(&self) -> bool {
        self.news || self.index || self.verified
    }

    /// Fold a content verdict into the flags, updating `md` to match.
    ///
    /// A plain sitemap verdict clears news/index flags left over from
    /// earlier fetches, unless the item is verified.
    pub fn reconcile(&mut self, detected: SitemapType, md: &mut Metadata) {
        self.sitemap = true;
        md.set_flag(keys::IS_SITEMAP, true);

        match detected {
            SitemapType::News => {
                self.news = true;
                md.set_flag(keys::IS_SITEMAP_NEWS, true);
            }
            SitemapType::Index => {
                if self.news {
                    md.set_flag(keys::IS_SITEMAP_NEWS, false);
                }
                self.news = false;
                self.index = true;
                md.set_flag(keys::IS_SITEMAP_INDEX, true);
            }
            SitemapType::Sitemap if self.verified => {}
            SitemapType::Sitemap => {
                if self.news {
                    md.set_flag(keys::IS_SITEMAP_NEWS, false);
                }
                if self.index {
                    md.set_flag(keys::IS_SITEMAP_INDEX, false);
                }
                self.news = false;
                self.index = false;
            }
        }
    }
}

/// Maps the first matching sitemap clue to a [`SitemapType`].
#[derive(Debug, Clone)]
pub struct SitemapClassifier {
    sniffer: ContentSniffer,
    news_end: usize,
    index_end: usize,
}

impl SitemapClassifier {
    pub fn new(clues: SitemapClues, max_offset: usize) -> Self {
        Self {
            sniffer: ContentSniffer::new(clues.table, max_offset),
            news_end: clues.news_end,
            index_end: clues.index_end,
        }
    }

    pub fn detect(&self, url: &str, content: &[u8]) -> Option<SitemapType> {
        let idx = self.sniffer.first_match(content)?;
        if idx < self.news_end {
            log::info!("{url} detected as news sitemap based on content");
            Some(SitemapType::News)
        } else if idx < self.index_end {
            log::info!("{url} detected as sitemap index based on content");
            Some(SitemapType::Index)
        } else {
            Some(SitemapType::Sitemap)
        }
    }
}
