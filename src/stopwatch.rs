//! Stopwatch that turns elapsed wall time into billable hours.

use std::future::Future;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use crate::clock::Clock;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Running { started: Instant },
}

#[derive(Debug, Clone)]
pub struct Stopwatch {
    state: State,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Stopwatch { state: State::Idle }
    }
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running { .. })
    }

    /// Starts an idle watch or stops a running one. Stopping returns the time
    /// elapsed since the start.
    pub fn toggle(&mut self, now: Instant) -> Option<Duration> {
        match self.state {
            State::Idle => {
                self.state = State::Running { started: now };
                None
            }
            State::Running { started } => {
                self.state = State::Idle;
                Some(now.saturating_duration_since(started))
            }
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.state {
            State::Idle => Duration::ZERO,
            State::Running { started } => now.saturating_duration_since(started),
        }
    }

    pub fn display(&self, now: Instant) -> String {
        format_elapsed(self.elapsed(now))
    }
}

/// `HH:MM:SS`, truncated to whole seconds. Hours keep counting past 24.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Decimal hours with two places. Any non-zero time that would round to
/// `0.00` is reported as `0.01`.
pub fn hours_field(elapsed: Duration) -> String {
    let field = format!("{:.2}", elapsed.as_secs_f64() / 3600.0);
    if field == "0.00" && elapsed > Duration::ZERO {
        return "0.01".to_string();
    }
    field
}

/// Runs a stopwatch until `stop` resolves, calling `on_tick` with the
/// `HH:MM:SS` display once per second. Returns the elapsed time.
pub async fn run_until<F, T>(clock: &dyn Clock, stop: F, mut on_tick: T) -> Duration
where
    F: Future<Output = ()>,
    T: FnMut(&str),
{
    let mut watch = Stopwatch::new();
    let started = clock.instant();
    watch.toggle(started);
    debug!("stopwatch started");

    let mut ticker = time::interval_at(started + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            _ = ticker.tick() => on_tick(&watch.display(clock.instant())),
        }
    }

    let elapsed = watch.toggle(clock.instant()).unwrap_or_default();
    debug!(elapsed_ms = elapsed.as_millis() as u64, "stopwatch stopped");
    elapsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::DefaultClock;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_millis(1999)), "00:00:01");
        assert_eq!(format_elapsed(Duration::from_secs(3661)), "01:01:01");
        assert_eq!(format_elapsed(Duration::from_secs(25 * 3600 + 59)), "25:00:59");
    }

    #[test]
    fn test_hours_field() {
        assert_eq!(hours_field(Duration::ZERO), "0.00");
        assert_eq!(hours_field(Duration::from_millis(500)), "0.01");
        assert_eq!(hours_field(Duration::from_secs(90 * 60)), "1.50");
        assert_eq!(hours_field(Duration::from_secs(36)), "0.01");
        assert_eq!(hours_field(Duration::from_secs(8 * 3600)), "8.00");
    }

    #[test]
    fn test_toggle_transitions() {
        let mut watch = Stopwatch::new();
        let start = Instant::now();

        assert!(!watch.is_running());
        assert_eq!(watch.toggle(start), None);
        assert!(watch.is_running());
        assert_eq!(watch.display(start + Duration::from_secs(75)), "00:01:15");

        let elapsed = watch.toggle(start + Duration::from_secs(90));
        assert_eq!(elapsed, Some(Duration::from_secs(90)));
        assert!(!watch.is_running());
        assert_eq!(watch.elapsed(start + Duration::from_secs(500)), Duration::ZERO);
    }

    #[test]
    fn test_immediate_stop_reads_zero() {
        let mut watch = Stopwatch::new();
        let now = Instant::now();
        watch.toggle(now);

        let elapsed = watch.toggle(now).unwrap();

        assert_eq!(hours_field(elapsed), "0.00");
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_second_run_bills_minimum() {
        let mut ticks = Vec::new();
        let elapsed = run_until(
            &DefaultClock,
            time::sleep(Duration::from_millis(500)),
            |display| ticks.push(display.to_string()),
        )
        .await;

        assert_eq!(elapsed, Duration::from_millis(500));
        assert_eq!(hours_field(elapsed), "0.01");
        assert!(ticks.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_second() {
        let mut ticks = Vec::new();
        let elapsed = run_until(
            &DefaultClock,
            time::sleep(Duration::from_millis(3500)),
            |display| ticks.push(display.to_string()),
        )
        .await;

        assert_eq!(ticks, vec!["00:00:01", "00:00:02", "00:00:03"]);
        assert_eq!(format_elapsed(elapsed), "00:00:03");
    }
}
