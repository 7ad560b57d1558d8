//! Signature-driven adaptive refetch interval
//!
//! A fetched page whose content signature changed since the previous fetch is
//! revisited sooner (the interval halves towards the minimum); an unchanged
//! page is revisited 10% later each cycle, up to the maximum. Requires the
//! parse filters to have copied the previous signature to `signatureOld`
//! before computing the new one.

use chrono::{DateTime, Utc};
use newsline_core::{Metadata, Status, keys};

use crate::config::SchedulerConfig;
use crate::scheduler::{DefaultScheduler, Scheduler, after_minutes};

/// `EEE, dd MMM yyyy HH:mm:ss GMT`
pub fn format_http_date(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[derive(Debug, Clone)]
pub struct AdaptiveScheduler<S = DefaultScheduler> {
    baseline: S,
    default_interval: i64,
    min_interval: i64,
    max_interval: i64,
    set_last_modified: bool,
}

impl AdaptiveScheduler<DefaultScheduler> {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(DefaultScheduler::new(config), config)
    }
}

impl<S: Scheduler> AdaptiveScheduler<S> {
    pub fn new(baseline: S, config: &SchedulerConfig) -> Self {
        let min_interval = config.min_interval.max(0);
        Self {
            baseline,
            default_interval: config.default_interval,
            min_interval,
            max_interval: config.max_interval.max(min_interval),
            set_last_modified: config.set_last_modified,
        }
    }

    pub fn baseline(&self) -> &S {
        &self.baseline
    }

    /// Stored interval, or one derived from the baseline's decision
    fn current_interval(&self, metadata: &mut Metadata, now: DateTime<Utc>) -> i64 {
        if let Some(stored) = metadata.get_first(keys::FETCH_INTERVAL) {
            match stored.trim().parse::<i64>() {
                Ok(interval) => return interval,
                Err(e) => log::warn!("Ignoring invalid {} {stored:?}: {e}", keys::FETCH_INTERVAL),
            }
        }
        match self.baseline.schedule_at(Status::Fetched, metadata, now) {
            Some(next) => (next - now).num_minutes(),
            None => self.default_interval,
        }
    }
}

impl<S: Scheduler> Scheduler for AdaptiveScheduler<S> {
    fn schedule_at(
        &self,
        status: Status,
        metadata: &mut Metadata,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        log::debug!("Scheduling status: {status}, metadata: {metadata}");

        if status != Status::Fetched {
            return self.baseline.schedule_at(status, metadata, now);
        }

        let previous = self
            .current_interval(metadata, now)
            .clamp(self.min_interval, self.max_interval);

        let signature = metadata.get_first(keys::SIGNATURE).map(str::to_owned);
        let old_signature = metadata.get_first(keys::SIGNATURE_OLD).map(str::to_owned);
        let mut change_date = metadata
            .get_first(keys::SIGNATURE_CHANGE_DATE)
            .map(str::to_owned);
        let now_http = format_http_date(now);

        let changed = match (signature, old_signature) {
            (Some(sig), Some(old)) if sig == old => {
                // each signature pair is compared once
                metadata.remove(keys::SIGNATURE_OLD);
                change_date.get_or_insert_with(|| now_http.clone());
                false
            }
            (Some(_), Some(_)) => {
                change_date = Some(now_http.clone());
                if self.set_last_modified {
                    metadata.set_value(keys::LAST_MODIFIED, now_http.clone());
                }
                true
            }
            _ if metadata.get_first(keys::FETCH_STATUS_CODE) == Some("304") => false,
            _ => {
                log::error!("No signature for FETCHED page: {metadata}");
                return self.baseline.schedule_at(status, metadata, now);
            }
        };

        let interval = if changed {
            let interval = self.min_interval + (previous - self.min_interval) / 2;
            log::debug!("Signature has changed, fetchInterval decreased from {previous} to {interval}");
            interval
        } else {
            let interval = previous.saturating_add(previous / 10).min(self.max_interval);
            log::debug!("Unchanged, fetchInterval increased from {previous} to {interval}");
            interval
        };

        metadata.set_value(keys::FETCH_INTERVAL, interval.to_string());
        if let Some(date) = change_date {
            metadata.set_value(keys::SIGNATURE_CHANGE_DATE, date);
        }
        after_minutes(now, interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn scheduler() -> AdaptiveScheduler {
        AdaptiveScheduler::from_config(&SchedulerConfig::default())
    }

    fn fetched(signature: Option<&str>, old: Option<&str>, interval: Option<&str>) -> Metadata {
        let mut md = Metadata::new();
        if let Some(s) = signature {
            md.set_value(keys::SIGNATURE, s);
        }
        if let Some(s) = old {
            md.set_value(keys::SIGNATURE_OLD, s);
        }
        if let Some(i) = interval {
            md.set_value(keys::FETCH_INTERVAL, i);
        }
        md
    }

    #[test]
    fn unchanged_signature_grows_interval() {
        let mut md = fetched(Some("abc"), Some("abc"), Some("1440"));
        let next = scheduler().schedule_at(Status::Fetched, &mut md, now());

        assert_eq!(md.get_first(keys::FETCH_INTERVAL), Some("1584"));
        assert!(!md.contains_key(keys::SIGNATURE_OLD));
        assert_eq!(next, Some(now() + TimeDelta::minutes(1584)));
        assert_eq!(
            md.get_first(keys::SIGNATURE_CHANGE_DATE),
            Some("Sat, 01 Jun 2024 12:00:00 GMT")
        );
    }

    #[test]
    fn unchanged_keeps_existing_change_date() {
        let mut md = fetched(Some("abc"), Some("abc"), Some("1440"));
        md.set_value(keys::SIGNATURE_CHANGE_DATE, "Mon, 01 Jan 2024 00:00:00 GMT");
        scheduler().schedule_at(Status::Fetched, &mut md, now());
        assert_eq!(
            md.get_first(keys::SIGNATURE_CHANGE_DATE),
            Some("Mon, 01 Jan 2024 00:00:00 GMT")
        );
    }

    #[test]
    fn changed_signature_shrinks_interval() {
        let mut md = fetched(Some("abc"), Some("xyz"), Some("1440"));
        md.set_value(keys::SIGNATURE_CHANGE_DATE, "Mon, 01 Jan 2024 00:00:00 GMT");
        let next = scheduler().schedule_at(Status::Fetched, &mut md, now());

        assert_eq!(md.get_first(keys::FETCH_INTERVAL), Some("750"));
        assert_eq!(next, Some(now() + TimeDelta::minutes(750)));
        assert_eq!(
            md.get_first(keys::SIGNATURE_CHANGE_DATE),
            Some("Sat, 01 Jun 2024 12:00:00 GMT")
        );
        assert_eq!(md.get_first(keys::SIGNATURE_OLD), Some("xyz"));
        assert!(!md.contains_key(keys::LAST_MODIFIED));
    }

    #[test]
    fn change_optionally_sets_last_modified() {
        let config = SchedulerConfig {
            set_last_modified: true,
            ..Default::default()
        };
        let mut md = fetched(Some("abc"), Some("xyz"), Some("1440"));
        AdaptiveScheduler::from_config(&config).schedule_at(Status::Fetched, &mut md, now());
        assert_eq!(
            md.get_first(keys::LAST_MODIFIED),
            Some("Sat, 01 Jun 2024 12:00:00 GMT")
        );
    }

    #[test]
    fn repeated_cycles_stay_within_bounds() {
        let s = scheduler();
        let mut md = fetched(None, None, Some("1440"));
        for _ in 0..50 {
            md.set_value(keys::SIGNATURE, "a");
            md.set_value(keys::SIGNATURE_OLD, "b");
            s.schedule_at(Status::Fetched, &mut md, now());
            let interval: i64 = md.get_first(keys::FETCH_INTERVAL).unwrap().parse().unwrap();
            assert!(interval >= 60);
        }
        for _ in 0..100 {
            md.set_value(keys::SIGNATURE_OLD, "a");
            s.schedule_at(Status::Fetched, &mut md, now());
            let interval: i64 = md.get_first(keys::FETCH_INTERVAL).unwrap().parse().unwrap();
            assert!(interval <= 20160);
        }
        assert_eq!(md.get_first(keys::FETCH_INTERVAL), Some("20160"));
    }

    #[test]
    fn out_of_range_stored_interval_is_clamped() {
        let mut md = fetched(Some("a"), Some("a"), Some("99999"));
        scheduler().schedule_at(Status::Fetched, &mut md, now());
        assert_eq!(md.get_first(keys::FETCH_INTERVAL), Some("20160"));

        let mut md = fetched(Some("a"), Some("b"), Some("1"));
        scheduler().schedule_at(Status::Fetched, &mut md, now());
        assert_eq!(md.get_first(keys::FETCH_INTERVAL), Some("60"));
    }

    #[test]
    fn missing_interval_bootstraps_from_baseline() {
        let mut md = fetched(Some("a"), Some("a"), None);
        scheduler().schedule_at(Status::Fetched, &mut md, now());
        // baseline default 1440, unchanged: +10%
        assert_eq!(md.get_first(keys::FETCH_INTERVAL), Some("1584"));
    }

    #[test]
    fn not_modified_without_signatures_counts_as_unchanged() {
        let mut md = fetched(None, None, Some("1000"));
        md.set_value(keys::FETCH_STATUS_CODE, "304");
        let next = scheduler().schedule_at(Status::Fetched, &mut md, now());
        assert_eq!(md.get_first(keys::FETCH_INTERVAL), Some("1100"));
        assert_eq!(next, Some(now() + TimeDelta::minutes(1100)));
        assert!(!md.contains_key(keys::SIGNATURE_CHANGE_DATE));
    }

    #[test]
    fn missing_signature_falls_back_to_baseline() {
        let mut md = fetched(Some("abc"), None, Some("1000"));
        md.set_value(keys::FETCH_STATUS_CODE, "200");
        let next = scheduler().schedule_at(Status::Fetched, &mut md, now());
        assert_eq!(next, Some(now() + TimeDelta::minutes(1440)));
        assert_eq!(md.get_first(keys::FETCH_INTERVAL), Some("1000"));

        // no status code at all is not a 304
        let mut md = fetched(None, None, Some("1000"));
        let next = scheduler().schedule_at(Status::Fetched, &mut md, now());
        assert_eq!(next, Some(now() + TimeDelta::minutes(1440)));
    }

    #[test]
    fn other_statuses_delegate() {
        let mut md = fetched(Some("a"), Some("b"), Some("1000"));
        let next = scheduler().schedule_at(Status::FetchError, &mut md, now());
        assert_eq!(next, Some(now() + TimeDelta::minutes(120)));
        assert_eq!(md.get_first(keys::SIGNATURE_OLD), Some("b"));
        assert_eq!(scheduler().schedule_at(Status::Error, &mut md, now()), None);
    }

    #[test]
    fn invalid_stored_interval_is_rebootstrapped() {
        let mut md = fetched(Some("a"), Some("a"), Some("often"));
        scheduler().schedule_at(Status::Fetched, &mut md, now());
        assert_eq!(md.get_first(keys::FETCH_INTERVAL), Some("1584"));
    }

    #[test]
    fn huge_intervals_saturate_at_the_bound() {
        let config = SchedulerConfig {
            max_interval: i64::MAX,
            ..Default::default()
        };
        let scheduler = AdaptiveScheduler::from_config(&config);
        let near_max = (i64::MAX - 10).to_string();

        let mut md = fetched(Some("a"), Some("a"), Some(&near_max));
        // too far out to be a date
        assert_eq!(scheduler.schedule_at(Status::Fetched, &mut md, now()), None);
        assert_eq!(md.get_first(keys::FETCH_INTERVAL), Some(i64::MAX.to_string().as_str()));

        let mut md = fetched(Some("a"), Some("b"), Some(&i64::MAX.to_string()));
        scheduler.schedule_at(Status::Fetched, &mut md, now());
        let halved = 60 + (i64::MAX - 60) / 2;
        assert_eq!(md.get_first(keys::FETCH_INTERVAL), Some(halved.to_string().as_str()));
    }

    #[test]
    fn http_date_format() {
        let date = Utc.with_ymd_and_hms(2024, 1, 7, 8, 5, 3).unwrap();
        assert_eq!(format_http_date(date), "Sun, 07 Jan 2024 08:05:03 GMT");
    }
}
