//! Outlink construction: URL normalisation and parent-to-child metadata transfer

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;
use crate::metadata::{Metadata, keys};
use crate::status::Outlink;

/// Rewrites or rejects a link target. `None` drops the link.
pub trait UrlFilter: Send + Sync + fmt::Debug {
    fn filter(&self, source: &Url, target: &str) -> Option<String>;
}

/// Converts internationalised host names to their ASCII (punycode) form.
///
/// Only the host is rewritten; the rest of the target is kept as written.
/// Malformed URLs are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct PunycodeNormalizer;

impl UrlFilter for PunycodeNormalizer {
    fn filter(&self, _source: &Url, target: &str) -> Option<String> {
        let url = Url::parse(target).ok()?;
        match raw_host_range(target) {
            Some(range) if !target[range.clone()].is_ascii() => {
                let host = url.host_str()?;
                let mut out = String::with_capacity(target.len() + host.len());
                out.push_str(&target[..range.start]);
                out.push_str(host);
                out.push_str(&target[range.end..]);
                Some(out)
            }
            _ => Some(target.to_string()),
        }
    }
}

/// Byte range of the host in `target` as written, without userinfo and port
fn raw_host_range(target: &str) -> Option<Range<usize>> {
    let start = target.find("://")? + 3;
    let rest = &target[start..];
    let authority = &rest[..rest.find(['/', '?', '#']).unwrap_or(rest.len())];
    let host_start = authority.rfind('@').map_or(0, |i| i + 1);
    let host = &authority[host_start..];
    let host_len = match host.rfind(':') {
        Some(i) if !host.ends_with(']') && host[i + 1..].bytes().all(|b| b.is_ascii_digit()) => i,
        _ => host.len(),
    };
    Some(start + host_start..start + host_start + host_len)
}

/// Removes the `#fragment` part of a target.
#[derive(Debug, Clone, Copy, Default)]
pub struct FragmentStripper;

impl UrlFilter for FragmentStripper {
    fn filter(&self, _source: &Url, target: &str) -> Option<String> {
        match target.split_once('#') {
            Some((head, _)) => Some(head.to_string()),
            None => Some(target.to_string()),
        }
    }
}

/// Ordered chain of URL filters.
#[derive(Debug, Clone, Default)]
pub struct UrlFilters {
    filters: Vec<Arc<dyn UrlFilter>>,
}

impl UrlFilters {
    pub fn from_names(names: &[String]) -> Result<Self, ConfigError> {
        let mut chain = Self::default();
        for name in names {
            let filter: Arc<dyn UrlFilter> = match name.as_str() {
                "punycode" => Arc::new(PunycodeNormalizer),
                "strip_fragment" => Arc::new(FragmentStripper),
                other => return Err(ConfigError::UnknownUrlFilter(other.to_string())),
            };
            chain.filters.push(filter);
        }
        Ok(chain)
    }

    pub fn with(mut self, filter: impl UrlFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn filter(&self, source: &Url, target: &str) -> Option<String> {
        let mut current = target.to_string();
        for f in &self.filters {
            current = f.filter(source, &current)?;
        }
        Some(current)
    }
}

/// `[outlinks]` configuration section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutlinksConfig {
    /// URL filter names in execution order
    pub url_filters: Vec<String>,
    /// Metadata keys copied from the parent document to its outlinks
    pub transfer: Vec<String>,
    /// Record the chain of parent URLs under `url.path`
    pub track_path: bool,
    /// Record the link depth under `depth`
    pub track_depth: bool,
}

impl Default for OutlinksConfig {
    fn default() -> Self {
        Self {
            url_filters: vec!["punycode".into(), "strip_fragment".into()],
            transfer: Vec::new(),
            track_path: true,
            track_depth: true,
        }
    }
}

/// Builds the metadata fragment an outlink inherits from its parent.
#[derive(Debug, Clone)]
pub struct MetadataTransfer {
    keys: Vec<String>,
    track_path: bool,
    track_depth: bool,
}

impl MetadataTransfer {
    pub fn new(keys: Vec<String>, track_path: bool, track_depth: bool) -> Self {
        Self {
            keys,
            track_path,
            track_depth,
        }
    }

    pub fn transfer(&self, source_url: &str, parent: &Metadata) -> Metadata {
        let mut md = Metadata::new();
        for key in &self.keys {
            let values = parent.values(key);
            if !values.is_empty() {
                md.set_values(key.clone(), values.to_vec());
            }
        }
        if self.track_path {
            let mut path = parent.values(keys::URL_PATH).to_vec();
            path.push(source_url.to_string());
            md.set_values(keys::URL_PATH, path);
        }
        if self.track_depth {
            let depth = parent
                .get_first(keys::DEPTH)
                .and_then(|d| d.parse::<u32>().ok())
                .unwrap_or(0);
            md.set_value(keys::DEPTH, (depth + 1).to_string());
        }
        md
    }
}

impl Default for MetadataTransfer {
    fn default() -> Self {
        Self::new(Vec::new(), true, true)
    }
}

/// Turns raw targets found in a document into filtered, annotated outlinks.
#[derive(Debug, Clone, Default)]
pub struct OutlinkFactory {
    url_filters: UrlFilters,
    transfer: MetadataTransfer,
}

impl OutlinkFactory {
    pub fn new(url_filters: UrlFilters, transfer: MetadataTransfer) -> Self {
        Self {
            url_filters,
            transfer,
        }
    }

    pub fn from_config(config: &OutlinksConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            UrlFilters::from_names(&config.url_filters)?,
            MetadataTransfer::new(config.transfer.clone(), config.track_path, config.track_depth),
        ))
    }

    /// Build an outlink with `tags` set on top of the transferred metadata.
    ///
    /// Returns `None` when a URL filter rejects the target.
    pub fn outlink(
        &self,
        source: &Url,
        target: &str,
        parent: &Metadata,
        tags: &[(&str, &str)],
    ) -> Option<Outlink> {
        let Some(target) = self.url_filters.filter(source, target) else {
            log::debug!("{source}: outlink rejected by URL filters: {target}");
            return None;
        };
        let mut md = self.transfer.transfer(source.as_str(), parent);
        for (k, v) in tags {
            md.set_value(*k, *v);
        }
        Some(Outlink::new(target, md))
    }
}
