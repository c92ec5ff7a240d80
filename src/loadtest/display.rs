//! Live terminal display for load test progress.
//!
//! Renders a single in-place updating spinner line showing completed/total
//! requests, active/spawned workers, requests per second, approximate P95
//! latency, error count/rate, and elapsed time. Updates come from the
//! engine's watch channel, not per-request.
//!
//! `colored` has one process-wide switch, so color is decided per stream
//! right before writing to it: [`LiveDisplay::new`] decides for stderr and
//! the run command decides again for stdout before printing the summary.

use crate::loadtest::metrics::RunProgress;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Latency above which the live P95 is highlighted (milliseconds).
const SLOW_P95_MS: f64 = 1000.0;

/// Color decision for one output stream.
///
/// `Some(false)` forces color off. `None` defers to `colored`'s own
/// environment handling (`NO_COLOR`, `CLICOLOR_FORCE`).
pub fn color_override(no_color: bool, is_terminal: bool) -> Option<bool> {
    if no_color || !is_terminal {
        Some(false)
    } else {
        None
    }
}

/// Install a decision made by [`color_override`].
pub fn apply_color_override(choice: Option<bool>) {
    match choice {
        Some(enabled) => colored::control::set_override(enabled),
        None => colored::control::unset_override(),
    }
}

/// Live spinner line on stderr.
pub struct LiveDisplay {
    status_bar: ProgressBar,
}

impl LiveDisplay {
    /// Create a new live display.
    ///
    /// If `no_color` is true or stderr is not a terminal (piped),
    /// color output is disabled until the next stream decides.
    pub fn new(no_color: bool) -> Self {
        apply_color_override(color_override(no_color, std::io::stderr().is_terminal()));

        let status_bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        status_bar.set_style(style);
        status_bar.enable_steady_tick(Duration::from_millis(100));

        Self { status_bar }
    }

    /// Format a single line of live status from a progress snapshot.
    ///
    /// Errors are shown in red when present, and P95 in yellow once it
    /// passes one second.
    pub fn format_status(progress: &RunProgress, elapsed: Duration) -> String {
        let elapsed_secs = elapsed.as_secs_f64();
        let rps = if elapsed_secs > 0.0 {
            progress.completed as f64 / elapsed_secs
        } else {
            0.0
        };

        let done_str = format!("{}/{}", progress.completed, progress.total_requests);
        let workers_str = format!("{}/{}", progress.active_workers, progress.workers);
        let rps_str = format!("{rps:.1}");
        let p95_str = format!("{:.1}ms", progress.p95_ms);
        let error_count_str = progress.error_count.to_string();
        let error_rate_str = format!("{:.1}%", progress.error_rate() * 100.0);
        let elapsed_str = format!("{:.1}s", elapsed_secs);

        let p95_display = if progress.p95_ms > SLOW_P95_MS {
            p95_str.yellow().to_string()
        } else {
            p95_str.green().to_string()
        };
        let error_display = if progress.error_count > 0 {
            format!("{} ({})", error_count_str.red(), error_rate_str.red())
        } else {
            format!("{error_count_str} ({error_rate_str})")
        };

        format!(
            "  requests: {}  |  workers: {}  |  rps: {}  |  p95: {}  |  errors: {}  |  elapsed: {}",
            done_str.green(),
            workers_str.green(),
            rps_str.green(),
            p95_display,
            error_display,
            elapsed_str
        )
    }

    /// Update the display with the latest snapshot.
    pub fn update(&self, progress: &RunProgress, elapsed: Duration) {
        self.status_bar
            .set_message(Self::format_status(progress, elapsed));
    }

    /// Stop the display and clear the spinner.
    pub fn finish(&self) {
        self.status_bar.finish_and_clear();
    }
}

/// Run the live display loop.
///
/// Redraws on every published [`RunProgress`] and stops once the watch
/// sender is dropped, which happens when the run finishes.
pub async fn display_loop(
    mut progress_rx: watch::Receiver<RunProgress>,
    no_color: bool,
    started: Instant,
) {
    let display = LiveDisplay::new(no_color);

    eprintln!();
    eprintln!("  Running load test...");
    eprintln!();

    while progress_rx.changed().await.is_ok() {
        let progress = progress_rx.borrow_and_update().clone();
        display.update(&progress, started.elapsed());
    }

    display.finish();
}
