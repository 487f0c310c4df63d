//! Terminal output helpers: the status line macros and the progress reporter.
use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use std::fmt::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Prints a warning line. Suppressed in greppable mode and uncoloured in
/// accessible mode.
#[macro_export]
macro_rules! warning {
    ($name:expr) => {
        println!("{} {}", colored::Colorize::bold(colored::Colorize::red("[!]")), $name);
    };
    ($name:expr, $greppable:expr, $accessible:expr) => {
        // if not greppable then print, otherwise no else statement so do not print.
        if !$greppable {
            if $accessible {
                println!("{}", $name);
            } else {
                println!("{} {}", colored::Colorize::bold(colored::Colorize::red("[!]")), $name);
            }
        }
    };
}

/// Prints an informational line about what the scan is doing.
#[macro_export]
macro_rules! detail {
    ($name:expr) => {
        println!("{} {}", colored::Colorize::bold(colored::Colorize::blue("[~]")), $name);
    };
    ($name:expr, $greppable:expr, $accessible:expr) => {
        if !$greppable {
            if $accessible {
                println!("{}", $name);
            } else {
                println!("{} {}", colored::Colorize::bold(colored::Colorize::blue("[~]")), $name);
            }
        }
    };
}

const TICK_INTERVAL: Duration = Duration::from_millis(100);
const TEMPLATE: &str = "{spinner:.cyan} Scanning ports... [{bar:20}] {percent}% completed";

/// Completion percentage for `completed` out of `total` ports.
///
/// Only reports 100 when every port has completed; anything short of that
/// is capped at 99 so rounding never claims a finished scan early.
pub fn percentage(completed: u64, total: u64) -> u64 {
    if total == 0 || completed >= total {
        return 100;
    }
    (completed * 100 / total).min(99)
}

/// Bar style whose percentage goes through [`percentage`] rather than
/// indicatif's rounded one.
fn style() -> ProgressStyle {
    ProgressStyle::with_template(TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .with_key("percent", |state: &ProgressState, w: &mut dyn Write| {
            let percent = percentage(state.pos(), state.len().unwrap_or(0));
            let _ = write!(w, "{percent:>3}");
        })
        .progress_chars("= ")
}

/// Renders scan progress as a single coalesced line.
///
/// Cloning is cheap; every clone drives the same bar. Workers call
/// [`ProgressReporter::advance`] with the completed count they observed,
/// and counts that arrive out of order never move the bar backwards.
#[derive(Clone, Debug)]
pub struct ProgressReporter {
    bar: ProgressBar,
    shown: Arc<Mutex<u64>>,
    total: u64,
}

impl ProgressReporter {
    /// A visible progress bar with a spinner ticking every 100ms.
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total).with_style(style());
        bar.enable_steady_tick(TICK_INTERVAL);
        Self::with_bar(bar, total)
    }

    /// A reporter that tracks progress without drawing anything.
    pub fn hidden(total: u64) -> Self {
        Self::with_bar(ProgressBar::hidden(), total)
    }

    fn with_bar(bar: ProgressBar, total: u64) -> Self {
        bar.set_length(total);
        Self {
            bar,
            shown: Arc::new(Mutex::new(0)),
            total,
        }
    }

    /// Moves the bar to `completed` unless a larger count is already shown.
    pub fn advance(&self, completed: u64) {
        let mut shown = self.shown.lock().unwrap_or_else(PoisonError::into_inner);
        if completed > *shown {
            *shown = completed.min(self.total);
            self.bar.set_position(*shown);
        }
    }

    /// Highest completed count rendered so far.
    pub fn position(&self) -> u64 {
        *self.shown.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Percentage currently displayed.
    pub fn percent(&self) -> u64 {
        percentage(self.position(), self.total)
    }

    /// Stops the spinner and clears the line.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Stops the spinner, leaving the last drawn state on screen.
    pub fn abandon(&self) {
        self.bar.abandon();
    }
}
