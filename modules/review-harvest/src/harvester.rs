//! The incremental harvest loop.
//!
//! Each cycle scrolls, waits for the list to settle, extracts the items past
//! the committed count, and folds the result into the session state. The loop
//! ends only through the session's counters (or an end-of-list hint).

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use tracing::{info, warn};

use crate::config::HarvestConfig;
use crate::error::Result;
use crate::extract::BoundedExtractor;
use crate::review::Review;
use crate::scroll::ScrollDriver;
use crate::session::{HarvestPhase, HarvestSession};
use crate::stability::StabilityOutcome;
use crate::traits::{FieldExtractor, PageSource, ReviewSink};

/// How already-harvested items are recognised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DedupStrategy {
    /// Everything before the committed count is old. Assumes an append-only list.
    #[default]
    Positional,
    /// Positional window, plus a content hash filter on the extracted reviews.
    ContentKey,
}

impl FromStr for DedupStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positional" => Ok(DedupStrategy::Positional),
            "content-key" | "content_key" | "content" => Ok(DedupStrategy::ContentKey),
            other => Err(format!(
                "unknown dedup strategy {other:?} (expected positional or content-key)"
            )),
        }
    }
}

impl fmt::Display for DedupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupStrategy::Positional => f.write_str("positional"),
            DedupStrategy::ContentKey => f.write_str("content-key"),
        }
    }
}

/// What one scroll cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub attempt: u32,
    pub stability: StabilityOutcome,
    pub tail_len: usize,
    pub new_reviews: usize,
    pub failed: usize,
    pub duplicates: usize,
    /// Committed count after this cycle.
    pub committed: usize,
}

#[derive(Debug)]
pub struct HarvestReport {
    pub session: HarvestSession,
    pub reviews: Vec<Review>,
    pub cycles: Vec<CycleSummary>,
}

/// Suffix of `handles` not yet converted to reviews.
pub fn new_tail<H>(mut handles: Vec<H>, committed: usize) -> Vec<H> {
    if committed >= handles.len() {
        Vec::new()
    } else {
        handles.split_off(committed)
    }
}

pub struct Harvester<P, E> {
    source: P,
    extractor: E,
    config: HarvestConfig,
}

impl<P, E> Harvester<P, E>
where
    P: PageSource,
    E: FieldExtractor<P::Handle>,
{
    pub fn new(source: P, extractor: E, config: HarvestConfig) -> Self {
        Self {
            source,
            extractor,
            config,
        }
    }

    pub fn source(&self) -> &P {
        &self.source
    }

    /// Drive the page until a terminal phase and return everything collected.
    pub async fn harvest(&self) -> HarvestReport {
        let limits = self.config.limits();
        let driver = ScrollDriver::new(
            &self.source,
            self.config.poll_interval,
            self.config.wait_timeout,
        );
        let extractor = BoundedExtractor::new(
            &self.extractor,
            self.config.concurrency,
            self.config.wait_timeout,
        );

        let mut session = HarvestSession::start(limits);
        let mut reviews: Vec<Review> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut cycles = Vec::new();

        while !session.is_terminal() {
            let attempt = session.attempts + 1;
            info!(
                attempt,
                max_attempts = limits.max_scroll_attempts,
                "Scrolling for more reviews"
            );

            let stability = driver.advance(session.committed).await;

            let tail = match self.source.current_item_handles().await {
                Ok(handles) => new_tail(handles, session.committed),
                Err(e) => {
                    warn!(error = %e, "Failed to read review list, treating cycle as empty");
                    Vec::new()
                }
            };

            let batch = extractor.extract(&tail).await;
            let extracted = batch.reviews.len();
            let fresh: Vec<Review> = match self.config.dedup {
                DedupStrategy::Positional => batch.reviews,
                DedupStrategy::ContentKey => batch
                    .reviews
                    .into_iter()
                    .filter(|review| seen.insert(review.content_key()))
                    .collect(),
            };
            let new_reviews = fresh.len();
            reviews.extend(fresh);

            let end_of_list = match self.source.end_of_list().await {
                Ok(end) => end,
                Err(e) => {
                    warn!(error = %e, "End-of-list check failed");
                    false
                }
            };

            session = session.step(new_reviews, end_of_list, limits);

            info!(
                collected = reviews.len(),
                new = new_reviews,
                failed = batch.failed,
                "Cycle complete"
            );
            cycles.push(CycleSummary {
                attempt,
                stability,
                tail_len: tail.len(),
                new_reviews,
                failed: batch.failed,
                duplicates: extracted - new_reviews,
                committed: session.committed,
            });
        }

        match session.phase {
            HarvestPhase::Settled => info!(total = reviews.len(), "Review list complete"),
            HarvestPhase::Exhausted => info!(
                total = reviews.len(),
                empty_cycles = session.consecutive_empty,
                "No new reviews, stopping"
            ),
            HarvestPhase::Aborted => info!(
                total = reviews.len(),
                attempts = session.attempts,
                "Scroll attempt limit reached, stopping"
            ),
            HarvestPhase::Running => {}
        }

        HarvestReport {
            session,
            reviews,
            cycles,
        }
    }

    /// Harvest, then hand every review to `sink`. A sink failure is fatal.
    pub async fn run<S: ReviewSink>(&self, sink: &S) -> Result<HarvestReport> {
        let report = self.harvest().await;
        sink.write(&report.reviews).await?;
        Ok(report)
    }
}
