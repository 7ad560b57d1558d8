//! Schedule subcommand - next fetch date for a URL's metadata

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use newsline_core::{Metadata, Status};
use newsline_schedule::{AdaptiveScheduler, Scheduler};
use serde::Serialize;

use super::{metadata_from, parse_meta};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Crawl status (discovered, fetched, fetch_error, redirection, error)
    #[arg(short, long, default_value = "fetched")]
    pub status: Status,

    /// Metadata of the URL (repeatable)
    #[arg(short, long = "meta", value_parser = parse_meta)]
    pub meta: Vec<(String, String)>,

    /// Reference time (RFC 3339), defaults to now
    #[arg(long, value_parser = parse_now)]
    pub now: Option<DateTime<Utc>>,
}

fn parse_now(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| format!("Invalid RFC 3339 date: {e}"))
}

#[derive(Serialize)]
struct Decision<'a> {
    status: Status,
    /// `None` when the URL is never refetched
    next_fetch: Option<String>,
    metadata: &'a Metadata,
}

pub fn run(args: ScheduleArgs, config: &Config) -> Result<()> {
    let scheduler = AdaptiveScheduler::from_config(&config.scheduler);
    let mut metadata = metadata_from(&args.meta);
    let now = args.now.unwrap_or_else(Utc::now);

    let next = scheduler.schedule_at(args.status, &mut metadata, now);
    let decision = Decision {
        status: args.status,
        next_fetch: next.map(|d| d.to_rfc3339()),
        metadata: &metadata,
    };

    let json = serde_json::to_string_pretty(&decision).context("Failed to encode decision")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        args: ScheduleArgs,
    }

    #[test]
    fn parses_status_meta_and_now() {
        let cli = Cli::try_parse_from([
            "schedule",
            "--status",
            "fetch-error",
            "--meta",
            "signature=abc",
            "--now",
            "2024-06-01T12:00:00Z",
        ])
        .unwrap();
        assert_eq!(cli.args.status, Status::FetchError);
        assert_eq!(cli.args.meta, [("signature".to_string(), "abc".to_string())]);
        assert_eq!(
            cli.args.now.unwrap().to_rfc3339(),
            "2024-06-01T12:00:00+00:00"
        );
    }

    #[test]
    fn rejects_unknown_status() {
        assert!(Cli::try_parse_from(["schedule", "--status", "parked"]).is_err());
    }
}
