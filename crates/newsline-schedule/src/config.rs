//! `[scheduler]` configuration section. All intervals are in minutes.

use serde::Deserialize;

/// Interval override for items whose metadata has `key` set to `value`.
///
/// ```toml
/// [[scheduler.custom]]
/// key = "isFeed"
/// value = "true"
/// interval = 60
/// fetch_error_interval = 240
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CustomInterval {
    pub key: String,
    pub value: String,
    pub interval: i64,
    #[serde(default)]
    pub fetch_error_interval: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Refetch interval of successfully fetched items
    pub default_interval: i64,
    pub fetch_error_interval: i64,
    /// Negative: items in error are never refetched
    pub error_interval: i64,
    /// Lower bound of the adaptive interval
    pub min_interval: i64,
    /// Upper bound of the adaptive interval
    pub max_interval: i64,
    /// Surface a detected content change as `Last-Modified`
    pub set_last_modified: bool,
    /// First matching rule wins
    pub custom: Vec<CustomInterval>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_interval: 1440,
            fetch_error_interval: 120,
            error_interval: -1,
            min_interval: 60,
            max_interval: 60 * 24 * 14,
            set_last_modified: false,
            custom: Vec::new(),
        }
    }
}
