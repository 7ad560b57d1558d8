//! newsline - classify crawled documents and schedule their refetch
//!
//! Runs the sitemap/feed classification pipeline over fetched documents stored
//! on disk and the adaptive refetch scheduler over crawl metadata.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "newsline")]
#[command(about = "Sitemap and feed classification for news crawls")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file path (default: ./newsline.toml or ~/.config/newsline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Classify fetched documents and resolve sitemaps into status records
    Classify(cmd::classify::ClassifyArgs),
    /// Compute the next fetch date of a URL from its metadata
    Schedule(cmd::schedule::ScheduleArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let progress = newsline_core::Progress::new();

    // TTY: progress bars show activity, so only warnings unless --debug
    let quiet = cli.quiet || (progress.is_tty() && !cli.debug);
    newsline_core::init_logging(quiet, cli.debug, progress.multi())?;

    let config = match cli.config {
        Some(path) => Config::from_file(&path)?,
        None => Config::load()?,
    };

    match cli.command {
        Command::Classify(args) => cmd::classify::run(args, &config, &progress),
        Command::Schedule(args) => cmd::schedule::run(args, &config),
        Command::Config => {
            cmd::show_config(&config);
            Ok(())
        }
    }
}
