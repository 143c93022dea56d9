//! Decides when a progressively-rendered list has stopped growing.
//!
//! Rendering arrives in bursts, so a single count change proves nothing. The
//! list counts as settled once it has grown past the baseline and then held
//! the same count for two consecutive polls.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::traits::PageSource;

/// Consecutive unchanged polls required after the last change.
const STABLE_POLLS: u32 = 2;

/// Floor for the poll period; `tokio::time::interval` rejects zero.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilityOutcome {
    /// Grew past the baseline and held still.
    Settled { count: usize },
    /// Timed out without ever exceeding the baseline.
    NoGrowth,
    /// Timed out after growing, but the count never held still.
    Unstable { last_count: usize },
}

impl StabilityOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(self, StabilityOutcome::Settled { .. })
    }
}

/// Poll-by-poll bookkeeping, kept separate from the clock so the rule is testable.
#[derive(Debug, Clone)]
pub(crate) struct SettleTracker {
    baseline: usize,
    last: usize,
    stable: u32,
    grew: bool,
}

impl SettleTracker {
    pub(crate) fn new(baseline: usize) -> Self {
        Self {
            baseline,
            last: baseline,
            stable: 0,
            grew: false,
        }
    }

    /// Record one observation. Returns true once the list has settled.
    pub(crate) fn observe(&mut self, count: usize) -> bool {
        if count == self.last {
            self.stable += 1;
        } else {
            self.stable = 0;
            self.last = count;
        }
        if count > self.baseline {
            self.grew = true;
        }
        count > self.baseline && self.stable >= STABLE_POLLS
    }

    fn timed_out(&self) -> StabilityOutcome {
        if self.grew {
            StabilityOutcome::Unstable {
                last_count: self.last,
            }
        } else {
            StabilityOutcome::NoGrowth
        }
    }
}

pub struct StabilityDetector<'a, P> {
    source: &'a P,
    poll_interval: Duration,
}

impl<'a, P: PageSource> StabilityDetector<'a, P> {
    pub fn new(source: &'a P, poll_interval: Duration) -> Self {
        Self {
            source,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        }
    }

    /// Wait until the item count exceeds `previous` and holds still, or `timeout` elapses.
    pub async fn await_settled(&self, previous: usize, timeout: Duration) -> StabilityOutcome {
        let mut tracker = SettleTracker::new(previous);

        let poll = async {
            let mut ticker = tokio::time::interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.source.item_count().await {
                    Ok(count) => {
                        if tracker.observe(count) {
                            return count;
                        }
                    }
                    Err(e) => debug!(error = %e, "Item count poll failed, skipping tick"),
                }
            }
        };
        let result = tokio::time::timeout(timeout, poll).await;

        match result {
            Ok(count) => {
                debug!(previous, count, "Item list settled");
                StabilityOutcome::Settled { count }
            }
            Err(_) => {
                let outcome = tracker.timed_out();
                match outcome {
                    StabilityOutcome::NoGrowth => info!(
                        previous,
                        timeout_secs = timeout.as_secs(),
                        "No new items appeared before timeout"
                    ),
                    StabilityOutcome::Unstable { last_count } => warn!(
                        previous,
                        last_count,
                        timeout_secs = timeout.as_secs(),
                        "Items still rendering at timeout"
                    ),
                    StabilityOutcome::Settled { .. } => {}
                }
                outcome
            }
        }
    }

    /// Initial wait after navigation: succeed as soon as any item is rendered.
    pub async fn await_any_items(&self, timeout: Duration) -> bool {
        let poll = async {
            let mut ticker = tokio::time::interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Ok(count) = self.source.item_count().await {
                    if count > 0 {
                        return count;
                    }
                }
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(count) => {
                info!(count, "Reviews rendered");
                true
            }
            Err(_) => {
                warn!(
                    timeout_secs = timeout.as_secs(),
                    "Reviews did not load before timeout"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedPage;

    #[test]
    fn tracker_requires_growth_then_two_stable_polls() {
        let mut tracker = SettleTracker::new(10);
        assert!(!tracker.observe(14));
        assert!(!tracker.observe(20));
        assert!(!tracker.observe(20));
        assert!(tracker.observe(20));
    }

    #[test]
    fn tracker_never_settles_without_growth() {
        let mut tracker = SettleTracker::new(10);
        for _ in 0..10 {
            assert!(!tracker.observe(10));
        }
        assert_eq!(tracker.timed_out(), StabilityOutcome::NoGrowth);
    }

    #[test]
    fn tracker_resets_streak_on_every_change() {
        let mut tracker = SettleTracker::new(0);
        assert!(!tracker.observe(5));
        assert!(!tracker.observe(5));
        assert!(!tracker.observe(6));
        assert!(!tracker.observe(6));
        assert!(tracker.observe(6));
    }

    #[test]
    fn tracker_reports_unstable_after_growth() {
        let mut tracker = SettleTracker::new(0);
        tracker.observe(3);
        tracker.observe(4);
        assert_eq!(
            tracker.timed_out(),
            StabilityOutcome::Unstable { last_count: 4 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn settles_after_burst_rendering() {
        let page = ScriptedPage::new((0..12).collect::<Vec<usize>>())
            .with_scroll_targets([12])
            .with_render_step(4);
        page.scroll_to_bottom().await.unwrap();

        let detector = StabilityDetector::new(&page, Duration::from_millis(500));
        let outcome = detector.await_settled(0, Duration::from_secs(10)).await;

        assert_eq!(outcome, StabilityOutcome::Settled { count: 12 });
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_with_no_growth() {
        let page = ScriptedPage::new((0..3).collect::<Vec<usize>>()).with_scroll_targets([3]);
        page.scroll_to_bottom().await.unwrap();

        let detector = StabilityDetector::new(&page, Duration::from_millis(500));
        let outcome = detector.await_settled(3, Duration::from_secs(2)).await;

        assert_eq!(outcome, StabilityOutcome::NoGrowth);
        assert!(!outcome.is_settled());
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_unstable_when_rendering_outlasts_timeout() {
        let page = ScriptedPage::new((0..100).collect::<Vec<usize>>())
            .with_scroll_targets([100])
            .with_render_step(1);
        page.scroll_to_bottom().await.unwrap();

        let detector = StabilityDetector::new(&page, Duration::from_millis(500));
        let outcome = detector.await_settled(0, Duration::from_secs(2)).await;

        assert!(matches!(outcome, StabilityOutcome::Unstable { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_count_polls_are_skipped() {
        let page = ScriptedPage::new((0..5).collect::<Vec<usize>>())
            .with_initial_visible(5)
            .with_failing_counts(3);
        let detector = StabilityDetector::new(&page, Duration::from_millis(500));
        let started = tokio::time::Instant::now();

        let outcome = detector.await_settled(0, Duration::from_secs(10)).await;

        assert_eq!(outcome, StabilityOutcome::Settled { count: 5 });
        // Three failed ticks, then three observations of the settled count.
        assert!(started.elapsed() >= Duration::from_millis(2500));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_poll_interval_is_clamped() {
        let page = ScriptedPage::new((0..4).collect::<Vec<usize>>()).with_initial_visible(4);
        let detector = StabilityDetector::new(&page, Duration::ZERO);

        let outcome = detector.await_settled(0, Duration::from_secs(1)).await;

        assert_eq!(outcome, StabilityOutcome::Settled { count: 4 });
        assert!(detector.await_any_items(Duration::from_secs(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn await_any_items_times_out_on_empty_page() {
        let page = ScriptedPage::new(Vec::<usize>::new());
        let detector = StabilityDetector::new(&page, Duration::from_millis(500));
        assert!(!detector.await_any_items(Duration::from_secs(1)).await);
    }
}
