//! Progress reporting for batch runs.
//!
//! On a terminal a single item-count bar is drawn through indicatif; otherwise
//! the bar is hidden and only log output remains.

use std::io::IsTerminal;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Filled, head and empty cells
const BAR_CHARS: &str = "=>-";

fn count_style() -> Option<ProgressStyle> {
    ProgressStyle::with_template("{prefix:<10.cyan.bold} {bar:30.green/dim} {pos:>6}/{len:6} {per_sec:>8} {wide_msg:.dim}")
        .ok()
        .map(|s| s.progress_chars(BAR_CHARS))
}

pub struct Progress {
    multi: MultiProgress,
    is_tty: bool,
}

impl Progress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty: std::io::stderr().is_terminal(),
        }
    }

    /// Bar counting `total` work items; hidden when stderr is not a terminal
    pub fn items_bar(&self, name: &str, total: u64) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(total));
        if let Some(style) = count_style() {
            pb.set_style(style);
        }
        pb.set_prefix(name.to_string());
        pb
    }

    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// For the log bridge, `None` outside a terminal
    pub fn multi(&self) -> Option<&MultiProgress> {
        self.is_tty.then_some(&self.multi)
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}
