//! Baseline interval scheduler

use chrono::{DateTime, TimeDelta, Utc};
use newsline_core::{Metadata, Status, keys};

use crate::config::{CustomInterval, SchedulerConfig};

/// Decides when a URL should be fetched next. `None` means never.
pub trait Scheduler: Send + Sync {
    fn schedule_at(
        &self,
        status: Status,
        metadata: &mut Metadata,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>>;

    fn schedule(&self, status: Status, metadata: &mut Metadata) -> Option<DateTime<Utc>> {
        self.schedule_at(status, metadata, Utc::now())
    }
}

/// `now + minutes`, or `None` for negative (never) or out-of-range intervals
pub(crate) fn after_minutes(now: DateTime<Utc>, minutes: i64) -> Option<DateTime<Utc>> {
    if minutes < 0 {
        return None;
    }
    TimeDelta::try_minutes(minutes).and_then(|d| now.checked_add_signed(d))
}

/// Fixed intervals per status, optionally overridden by metadata-keyed rules.
///
/// Newly discovered URLs are due immediately unless their metadata carries a
/// `delay` in minutes.
#[derive(Debug, Clone)]
pub struct DefaultScheduler {
    default_interval: i64,
    fetch_error_interval: i64,
    error_interval: i64,
    custom: Vec<CustomInterval>,
}

impl DefaultScheduler {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            default_interval: config.default_interval,
            fetch_error_interval: config.fetch_error_interval,
            error_interval: config.error_interval,
            custom: config.custom.clone(),
        }
    }

    fn matching_rule(&self, metadata: &Metadata) -> Option<&CustomInterval> {
        self.custom
            .iter()
            .find(|rule| metadata.values(&rule.key).iter().any(|v| *v == rule.value))
    }

    /// Interval for a status, in minutes; negative means never
    pub fn interval(&self, status: Status, metadata: &Metadata) -> i64 {
        match status {
            Status::Discovered => metadata
                .get_first(keys::DELAY)
                .and_then(|d| d.trim().parse::<i64>().ok())
                .unwrap_or(0)
                .max(0),
            Status::Fetched | Status::Redirection => self
                .matching_rule(metadata)
                .map_or(self.default_interval, |rule| rule.interval),
            Status::FetchError => self
                .matching_rule(metadata)
                .and_then(|rule| rule.fetch_error_interval)
                .unwrap_or(self.fetch_error_interval),
            Status::Error => self.error_interval,
        }
    }
}

impl Default for DefaultScheduler {
    fn default() -> Self {
        Self::new(&SchedulerConfig::default())
    }
}

impl Scheduler for DefaultScheduler {
    fn schedule_at(
        &self,
        status: Status,
        metadata: &mut Metadata,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        after_minutes(now, self.interval(status, metadata))
    }
}
