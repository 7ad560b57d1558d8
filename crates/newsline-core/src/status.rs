//! Work items, status records and the per-item output contract

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metadata::{Metadata, keys};

/// Crawl status of a URL, as understood by the status persistence stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Discovered,
    Fetched,
    FetchError,
    Redirection,
    Error,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discovered => "DISCOVERED",
            Self::Fetched => "FETCHED",
            Self::FetchError => "FETCH_ERROR",
            Self::Redirection => "REDIRECTION",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "DISCOVERED" => Ok(Self::Discovered),
            "FETCHED" => Ok(Self::Fetched),
            "FETCH_ERROR" => Ok(Self::FetchError),
            "REDIRECTION" => Ok(Self::Redirection),
            "ERROR" => Ok(Self::Error),
            _ => Err(format!("unknown status: {s}")),
        }
    }
}

/// An already fetched document awaiting classification.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub url: String,
    pub content: Vec<u8>,
    pub metadata: Metadata,
}

impl WorkItem {
    pub fn new(url: impl Into<String>, content: Vec<u8>, metadata: Metadata) -> Self {
        Self {
            url: url.into(),
            content,
            metadata,
        }
    }

    /// Content type recorded by the fetcher, if any
    pub fn content_type(&self) -> Option<&str> {
        self.metadata.get_first(keys::CONTENT_TYPE)
    }
}

/// A discovered link and the metadata fragment it carries to its own work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outlink {
    pub target: String,
    pub metadata: Metadata,
}

impl Outlink {
    pub fn new(target: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            target: target.into(),
            metadata,
        }
    }

    /// Status record announcing this link to the crawl-state store
    pub fn into_record(self) -> StatusRecord {
        StatusRecord {
            url: self.target,
            metadata: self.metadata,
            status: Status::Discovered,
        }
    }
}

/// `(url, metadata, status)` as emitted to the status stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub url: String,
    pub status: Status,
    pub metadata: Metadata,
}

impl StatusRecord {
    pub fn new(url: impl Into<String>, metadata: Metadata, status: Status) -> Self {
        Self {
            url: url.into(),
            metadata,
            status,
        }
    }
}

/// Result of running one component over one work item.
#[derive(Debug)]
pub enum ItemOutput {
    /// Not handled here: the unchanged item continues downstream
    PassThrough(WorkItem),
    /// Handled: a status for the item itself plus any discovered links
    Terminal {
        record: StatusRecord,
        discovered: Vec<Outlink>,
    },
}

impl ItemOutput {
    pub fn terminal(record: StatusRecord) -> Self {
        Self::Terminal {
            record,
            discovered: Vec::new(),
        }
    }

    pub fn is_pass_through(&self) -> bool {
        matches!(self, Self::PassThrough(_))
    }

    /// Every status record this output produces, discovered links first
    pub fn into_records(self) -> Vec<StatusRecord> {
        match self {
            Self::PassThrough(_) => Vec::new(),
            Self::Terminal { record, discovered } => {
                let mut records: Vec<StatusRecord> =
                    discovered.into_iter().map(Outlink::into_record).collect();
                records.push(record);
                records
            }
        }
    }
}

/// Stage which produced an error status, recorded as `error.source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSource {
    SitemapParsing,
    ContentFiltering,
}

impl ErrorSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SitemapParsing => "sitemap parsing",
            Self::ContentFiltering => "content filtering",
        }
    }
}

/// Annotate `metadata` with an error and build the ERROR status record.
///
/// Drops `numLinks`: a failed attempt has no link count.
pub fn error_record(
    url: &str,
    mut metadata: Metadata,
    source: ErrorSource,
    message: String,
) -> StatusRecord {
    metadata.set_value(keys::ERROR_SOURCE, source.as_str());
    metadata.set_value(keys::ERROR_MESSAGE, message);
    metadata.remove(keys::NUM_LINKS);
    StatusRecord::new(url, metadata, Status::Error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_roundtrip_names() {
        for s in [
            Status::Discovered,
            Status::Fetched,
            Status::FetchError,
            Status::Redirection,
            Status::Error,
        ] {
            assert_eq!(s.as_str().parse::<Status>().unwrap(), s);
        }
        assert_eq!("fetch-error".parse::<Status>().unwrap(), Status::FetchError);
        assert!("gone".parse::<Status>().is_err());
    }

    #[test]
    fn status_serializes_uppercase() {
        let json = serde_json::to_string(&Status::FetchError).unwrap();
        assert_eq!(json, "\"FETCH_ERROR\"");
    }

    #[test]
    fn error_record_sets_source_and_drops_num_links() {
        let mut md = Metadata::new();
        md.set_value(keys::NUM_LINKS, "12");
        let rec = error_record(
            "https://example.org/sitemap.xml",
            md,
            ErrorSource::SitemapParsing,
            "boom".into(),
        );
        assert_eq!(rec.status, Status::Error);
        assert_eq!(rec.metadata.get_first(keys::ERROR_SOURCE), Some("sitemap parsing"));
        assert_eq!(rec.metadata.get_first(keys::ERROR_MESSAGE), Some("boom"));
        assert!(!rec.metadata.contains_key(keys::NUM_LINKS));
    }

    #[test]
    fn terminal_records_list_discovered_before_item() {
        let out = ItemOutput::Terminal {
            record: StatusRecord::new("https://a.org/", Metadata::new(), Status::Fetched),
            discovered: vec![Outlink::new("https://a.org/1", Metadata::new())],
        };
        let records = out.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, Status::Discovered);
        assert_eq!(records[0].url, "https://a.org/1");
        assert_eq!(records[1].status, Status::Fetched);
    }

    #[test]
    fn pass_through_has_no_records() {
        let out = ItemOutput::PassThrough(WorkItem::new("u", Vec::new(), Metadata::new()));
        assert!(out.is_pass_through());
        assert!(out.into_records().is_empty());
    }
}
