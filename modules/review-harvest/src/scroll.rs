use std::time::Duration;

use tracing::warn;

use crate::stability::{StabilityDetector, StabilityOutcome};
use crate::traits::PageSource;

/// Advance-and-wait against a page source. Owns no retry logic: whether a
/// cycle produced anything is judged by the harvester's counters.
pub struct ScrollDriver<'a, P> {
    source: &'a P,
    detector: StabilityDetector<'a, P>,
    wait_timeout: Duration,
}

impl<'a, P: PageSource> ScrollDriver<'a, P> {
    pub fn new(source: &'a P, poll_interval: Duration, wait_timeout: Duration) -> Self {
        Self {
            source,
            detector: StabilityDetector::new(source, poll_interval),
            wait_timeout,
        }
    }

    /// Scroll to the bottom, then wait for the list to settle above `baseline`.
    pub async fn advance(&self, baseline: usize) -> StabilityOutcome {
        if let Err(e) = self.source.scroll_to_bottom().await {
            warn!(error = %e, "Scroll command failed");
        }
        self.detector.await_settled(baseline, self.wait_timeout).await
    }
}
