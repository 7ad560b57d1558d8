//! Post-classification parse filters
//!
//! Filters run once a document has been classified (and, for sitemaps, parsed)
//! but before any status is emitted. They may rewrite the item's metadata and
//! the outlinks found so far.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::metadata::{Metadata, keys};
use crate::status::Outlink;

/// Metadata and outlinks of one document while filters run.
#[derive(Debug, Default)]
pub struct ParseResult {
    pub metadata: Metadata,
    pub outlinks: Vec<Outlink>,
}

impl ParseResult {
    pub fn new(metadata: Metadata, outlinks: Vec<Outlink>) -> Self {
        Self { metadata, outlinks }
    }
}

/// Unexpected failure inside a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterError {
    pub filter: String,
    pub message: String,
}

impl FilterError {
    pub fn new(filter: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "filter {} failed: {}", self.filter, self.message)
    }
}

impl std::error::Error for FilterError {}

pub trait ParseFilter: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn filter(&self, url: &str, content: &[u8], parse: &mut ParseResult)
    -> Result<(), FilterError>;
}

/// Copies the current signature so the next cycle can compare against it.
///
/// Must run before the signature is recomputed for the new content.
#[derive(Debug, Clone)]
pub struct SignatureCopyFilter {
    key: String,
    copy_key: String,
}

impl SignatureCopyFilter {
    pub fn new(key: impl Into<String>, copy_key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            copy_key: copy_key.into(),
        }
    }
}

impl Default for SignatureCopyFilter {
    fn default() -> Self {
        Self::new(keys::SIGNATURE, keys::SIGNATURE_OLD)
    }
}

impl ParseFilter for SignatureCopyFilter {
    fn name(&self) -> &str {
        "signature_copy"
    }

    fn filter(&self, _url: &str, _content: &[u8], parse: &mut ParseResult) -> Result<(), FilterError> {
        if let Some(sig) = parse.metadata.get_first(&self.key).map(str::to_owned) {
            parse.metadata.set_value(self.copy_key.clone(), sig);
        }
        Ok(())
    }
}

/// Stores a blake3 digest of the raw content as the document signature.
///
/// Empty content is signed by its URL.
#[derive(Debug, Clone)]
pub struct ContentSignatureFilter {
    key: String,
}

impl ContentSignatureFilter {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Default for ContentSignatureFilter {
    fn default() -> Self {
        Self::new(keys::SIGNATURE)
    }
}

impl ParseFilter for ContentSignatureFilter {
    fn name(&self) -> &str {
        "content_signature"
    }

    fn filter(&self, url: &str, content: &[u8], parse: &mut ParseResult) -> Result<(), FilterError> {
        let input = if content.is_empty() {
            url.as_bytes()
        } else {
            content
        };
        let digest = blake3::hash(input).to_hex().to_string();
        parse.metadata.set_value(self.key.clone(), digest);
        Ok(())
    }
}

/// `[filters]` configuration section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FiltersConfig {
    /// Filter names in execution order
    pub parse: Vec<String>,
    pub signature_key: String,
    pub signature_copy_key: String,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            parse: vec!["signature_copy".into(), "content_signature".into()],
            signature_key: keys::SIGNATURE.into(),
            signature_copy_key: keys::SIGNATURE_OLD.into(),
        }
    }
}

/// Ordered chain of parse filters, shared by all workers.
#[derive(Debug, Clone, Default)]
pub struct ParseFilters {
    filters: Vec<Arc<dyn ParseFilter>>,
}

impl ParseFilters {
    /// Chain without any filters
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_config(config: &FiltersConfig) -> Result<Self, ConfigError> {
        let mut chain = Self::empty();
        for name in &config.parse {
            let filter: Arc<dyn ParseFilter> = match name.as_str() {
                "signature_copy" => Arc::new(SignatureCopyFilter::new(
                    config.signature_key.clone(),
                    config.signature_copy_key.clone(),
                )),
                "content_signature" => {
                    Arc::new(ContentSignatureFilter::new(config.signature_key.clone()))
                }
                other => return Err(ConfigError::UnknownParseFilter(other.to_string())),
            };
            chain.filters.push(filter);
        }
        Ok(chain)
    }

    pub fn with(mut self, filter: impl ParseFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run every filter in order, stopping at the first failure
    pub fn filter(&self, url: &str, content: &[u8], parse: &mut ParseResult) -> Result<(), FilterError> {
        for f in &self.filters {
            f.filter(url, content, parse)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Failing;

    impl ParseFilter for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn filter(&self, _: &str, _: &[u8], _: &mut ParseResult) -> Result<(), FilterError> {
            Err(FilterError::new("failing", "boom"))
        }
    }

    #[test]
    fn signature_copy_copies_current_signature() {
        let mut parse = ParseResult::default();
        parse.metadata.set_value(keys::SIGNATURE, "abc");
        SignatureCopyFilter::default()
            .filter("u", b"", &mut parse)
            .unwrap();
        assert_eq!(parse.metadata.get_first(keys::SIGNATURE_OLD), Some("abc"));
    }

    #[test]
    fn signature_copy_without_signature_is_noop() {
        let mut parse = ParseResult::default();
        SignatureCopyFilter::default()
            .filter("u", b"", &mut parse)
            .unwrap();
        assert!(parse.metadata.is_empty());
    }

    #[test]
    fn default_chain_keeps_previous_signature() {
        let chain = ParseFilters::from_config(&FiltersConfig::default()).unwrap();
        assert_eq!(chain.len(), 2);

        let mut parse = ParseResult::default();
        parse.metadata.set_value(keys::SIGNATURE, "previous");
        chain.filter("u", b"new content", &mut parse).unwrap();

        assert_eq!(parse.metadata.get_first(keys::SIGNATURE_OLD), Some("previous"));
        let sig = parse.metadata.get_first(keys::SIGNATURE).unwrap();
        assert_eq!(sig, blake3::hash(b"new content").to_hex().as_str());
    }

    #[test]
    fn content_signature_of_empty_content_uses_url() {
        let mut parse = ParseResult::default();
        ContentSignatureFilter::default()
            .filter("https://example.org/", b"", &mut parse)
            .unwrap();
        assert_eq!(
            parse.metadata.get_first(keys::SIGNATURE).unwrap(),
            blake3::hash(b"https://example.org/").to_hex().as_str()
        );
    }

    #[test]
    fn unknown_filter_name_is_rejected() {
        let config = FiltersConfig {
            parse: vec!["xpath".into()],
            ..Default::default()
        };
        let err = ParseFilters::from_config(&config).unwrap_err();
        assert_eq!(err, ConfigError::UnknownParseFilter("xpath".into()));
    }

    #[test]
    fn chain_stops_at_first_failure() {
        let chain = ParseFilters::empty()
            .with(Failing)
            .with(ContentSignatureFilter::default());
        let mut parse = ParseResult::default();
        let err = chain.filter("u", b"x", &mut parse).unwrap_err();
        assert_eq!(err.filter, "failing");
        assert!(!parse.metadata.contains_key(keys::SIGNATURE));
    }
}
