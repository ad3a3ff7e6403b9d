//! Progress notifications from the diff scanner.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::info;

/// Receives progress notifications while commit pairs are diffed.
///
/// `on_tick` is called once per completed pair, from whichever task finished
/// it, so ticks arrive in no particular order. Observers never influence the
/// ranking.
pub trait ProgressObserver: Send + Sync {
    /// Scanning is about to start on `total` commit pairs.
    fn on_start(&self, total: usize);

    /// One commit pair has been diffed.
    fn on_tick(&self);
}

/// Discards all notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_start(&self, _total: usize) {}

    fn on_tick(&self) {}
}

/// Logs percentage complete and an ETA at most once per interval.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use bugspots_engine::progress::{IntervalReporter, ProgressObserver};
///
/// let reporter = IntervalReporter::new(Duration::from_secs(3));
/// reporter.on_start(10);
/// reporter.on_tick();
/// assert_eq!(reporter.completed(), 1);
/// ```
#[derive(Debug)]
pub struct IntervalReporter {
    interval: Duration,
    state: Mutex<ReporterState>,
}

#[derive(Debug)]
struct ReporterState {
    total: usize,
    count: usize,
    started: Instant,
    last_report: Instant,
}

impl IntervalReporter {
    pub fn new(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            interval,
            state: Mutex::new(ReporterState {
                total: 0,
                count: 0,
                started: now,
                last_report: now,
            }),
        }
    }

    /// Number of ticks received since the last `on_start`.
    pub fn completed(&self) -> usize {
        self.state.lock().map(|s| s.count).unwrap_or(0)
    }
}

impl ProgressObserver for IntervalReporter {
    fn on_start(&self, total: usize) {
        if let Ok(mut state) = self.state.lock() {
            let now = Instant::now();
            *state = ReporterState {
                total,
                count: 0,
                started: now,
                last_report: now,
            };
        }
        info!("[progress] total: {total}");
    }

    fn on_tick(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        state.count += 1;
        let now = Instant::now();
        if now.duration_since(state.last_report) > self.interval {
            state.last_report = now;
            info!(
                "{}",
                progress_line(state.count, state.total, now.duration_since(state.started))
            );
        }
    }
}

/// Format a progress report: percent done and estimated seconds remaining.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use bugspots_engine::progress::progress_line;
///
/// let line = progress_line(1, 4, Duration::from_secs(2));
/// assert_eq!(line, "[progress] 25.00% remaining: 6.00s");
/// ```
pub fn progress_line(count: usize, total: usize, elapsed: Duration) -> String {
    if count == 0 || total == 0 {
        return "[progress] 0.00%".to_string();
    }
    let percent = count as f64 / total as f64 * 100.0;
    let per_item = elapsed.as_secs_f64() / count as f64;
    let remaining = per_item * total.saturating_sub(count) as f64;
    format!("[progress] {percent:.2}% remaining: {remaining:.2}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_line_reports_completion() {
        let line = progress_line(10, 10, Duration::from_secs(5));
        assert_eq!(line, "[progress] 100.00% remaining: 0.00s");
    }

    #[test]
    fn progress_line_handles_nothing_done() {
        assert_eq!(progress_line(0, 5, Duration::ZERO), "[progress] 0.00%");
        assert_eq!(progress_line(0, 0, Duration::ZERO), "[progress] 0.00%");
    }

    #[test]
    fn reporter_counts_ticks_and_resets_on_start() {
        let reporter = IntervalReporter::new(Duration::from_millis(0));
        reporter.on_start(3);
        reporter.on_tick();
        reporter.on_tick();
        assert_eq!(reporter.completed(), 2);

        reporter.on_start(1);
        assert_eq!(reporter.completed(), 0);
    }
}
