//! Segment rotation on cumulative size or elapsed time, whichever comes first

use std::time::{Duration, Instant};

use serde::Deserialize;

/// Binary size units (powers of 1024).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SizeUnit {
    KB,
    MB,
    GB,
    TB,
}

impl SizeUnit {
    pub const fn byte_count(self) -> u64 {
        match self {
            Self::KB => 1 << 10,
            Self::MB => 1 << 20,
            Self::GB => 1 << 30,
            Self::TB => 1 << 40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    pub const fn seconds(self) -> u64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 60 * 60,
            Self::Days => 60 * 60 * 24,
        }
    }
}

/// `[rotation]` configuration section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    pub max_size: f64,
    pub size_unit: SizeUnit,
    /// Negative disables time-based rotation
    pub time_interval: f64,
    pub time_unit: TimeUnit,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            max_size: 1.0,
            size_unit: SizeUnit::GB,
            time_interval: -1.0,
            time_unit: TimeUnit::Hours,
        }
    }
}

/// Decides when the current output segment should be closed.
///
/// Driven by a single writer: every [`mark`](RotationPolicy::mark) call
/// advances the offset baseline, so bytes are counted as deltas between
/// consecutive calls.
#[derive(Debug, Clone)]
pub struct RotationPolicy {
    max_bytes: u64,
    interval: Option<Duration>,
    last_offset: u64,
    bytes_written: u64,
    started: Instant,
}

impl RotationPolicy {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            interval: None,
            last_offset: 0,
            bytes_written: 0,
            started: Instant::now(),
        }
    }

    pub fn with_size(count: f64, unit: SizeUnit) -> Self {
        Self::new((count * unit.byte_count() as f64) as u64)
    }

    /// Also rotate once `interval` has elapsed since the last reset
    pub fn with_time_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn from_config(config: &RotationConfig) -> Self {
        let policy = Self::with_size(config.max_size, config.size_unit);
        if config.time_interval < 0.0 {
            return policy;
        }
        let secs = config.time_interval * config.time_unit.seconds() as f64;
        match Duration::try_from_secs_f64(secs) {
            Ok(interval) => policy.with_time_interval(interval),
            Err(e) => {
                log::warn!(
                    "Ignoring rotation time interval {} {:?}: {e}",
                    config.time_interval,
                    config.time_unit
                );
                policy
            }
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Record that the writer reached `offset`; true if the segment should rotate.
    pub fn mark(&mut self, offset: u64) -> bool {
        self.mark_at(offset, Instant::now())
    }

    fn mark_at(&mut self, offset: u64, now: Instant) -> bool {
        if let Some(interval) = self.interval {
            if now.duration_since(self.started) >= interval {
                log::info!(
                    "Rotating segment based on time: interval {:?} elapsed",
                    interval
                );
                return true;
            }
        }

        self.bytes_written += offset.saturating_sub(self.last_offset);
        self.last_offset = offset;
        let rotate = self.bytes_written >= self.max_bytes;
        if rotate {
            log::info!(
                "Rotating segment based on size: {} bytes written, max {}",
                self.bytes_written,
                self.max_bytes
            );
        }
        rotate
    }

    /// Start a new segment: zero the byte count and restart the clock
    pub fn reset(&mut self) {
        self.bytes_written = 0;
        self.last_offset = 0;
        self.started = Instant::now();
    }
}
