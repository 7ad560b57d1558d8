//! Newsline Core - shared building blocks for the news crawl pipeline
//!
//! Metadata and status types exchanged between stages, the prefix content
//! sniffer, parse and URL filter chains, outlink construction, and segment
//! output with size/time rotation.

pub mod error;
pub mod filter;
pub mod logging;
pub mod metadata;
pub mod outlink;
pub mod progress;
pub mod rotation;
pub mod sink;
pub mod sniff;
pub mod status;

// Re-exports for convenience
pub use error::ConfigError;
pub use filter::{
    ContentSignatureFilter, FilterError, FiltersConfig, ParseFilter, ParseFilters, ParseResult,
    SignatureCopyFilter,
};
pub use logging::{ProgressLogger, init_logging};
pub use metadata::{Metadata, keys};
pub use outlink::{
    FragmentStripper, MetadataTransfer, OutlinkFactory, OutlinksConfig, PunycodeNormalizer,
    UrlFilter, UrlFilters,
};
pub use progress::Progress;
pub use rotation::{RotationConfig, RotationPolicy, SizeUnit, TimeUnit};
pub use sink::{SegmentSink, cleanup_tmp_files};
pub use sniff::{ClueTable, ContentSniffer};
pub use status::{ErrorSource, ItemOutput, Outlink, Status, StatusRecord, WorkItem, error_record};
