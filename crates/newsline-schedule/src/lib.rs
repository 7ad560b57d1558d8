//! Refetch scheduling for crawled URLs

pub mod adaptive;
pub mod config;
pub mod scheduler;

pub use adaptive::{AdaptiveScheduler, format_http_date};
pub use config::{CustomInterval, SchedulerConfig};
pub use scheduler::{DefaultScheduler, Scheduler};
