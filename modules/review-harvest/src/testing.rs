// Test fakes for the harvest loop.
//
// Two fakes matching the trait boundaries the loop drives:
// - ScriptedPage (PageSource): item list revealed by scripted scrolls, rendered in bursts;
//   scrolls, count polls and handle reads can be made to fail
// - ScriptedExtractor (FieldExtractor<usize>): per-id failures, flakes, hangs, delays;
//   records how many extractions were in flight at once
//
// Plus `review_for` to build the review ScriptedExtractor would produce.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::error::ExtractionError;
use crate::review::Review;
use crate::traits::{FieldExtractor, PageSource};

// ---------------------------------------------------------------------------
// ScriptedPage
// ---------------------------------------------------------------------------

/// In-memory infinite-scroll list.
///
/// Each `scroll_to_bottom()` pops the next scroll target (total items that
/// should eventually be visible). Every observation then renders up to
/// `render_step` more items until the target is reached.
pub struct ScriptedPage<H> {
    items: Vec<H>,
    state: Mutex<PageState>,
    render_step: usize,
    end_hint: bool,
    scrolls: AtomicUsize,
    failing_scrolls: bool,
    failing_counts: AtomicUsize,
    failing_reads: AtomicUsize,
}

struct PageState {
    visible: usize,
    target: usize,
    targets: VecDeque<usize>,
}

impl<H: Clone + Send + Sync> ScriptedPage<H> {
    pub fn new(items: Vec<H>) -> Self {
        Self {
            items,
            state: Mutex::new(PageState {
                visible: 0,
                target: 0,
                targets: VecDeque::new(),
            }),
            render_step: usize::MAX,
            end_hint: false,
            scrolls: AtomicUsize::new(0),
            failing_scrolls: false,
            failing_counts: AtomicUsize::new(0),
            failing_reads: AtomicUsize::new(0),
        }
    }

    /// Items already rendered before the first scroll.
    pub fn with_initial_visible(self, count: usize) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.visible = count.min(self.items.len());
            state.target = state.visible;
        }
        self
    }

    pub fn with_scroll_targets(self, targets: impl IntoIterator<Item = usize>) -> Self {
        self.state.lock().unwrap().targets.extend(targets);
        self
    }

    pub fn with_render_step(mut self, step: usize) -> Self {
        self.render_step = step.max(1);
        self
    }

    /// Report end-of-list once every scripted target has been fully rendered.
    pub fn with_end_of_list(mut self) -> Self {
        self.end_hint = true;
        self
    }

    /// Every scroll command fails. Scripted targets are never revealed.
    pub fn with_failing_scrolls(mut self) -> Self {
        self.failing_scrolls = true;
        self
    }

    /// The next `n` item-count polls fail.
    pub fn with_failing_counts(self, n: usize) -> Self {
        self.failing_counts.store(n, Ordering::SeqCst);
        self
    }

    /// The next `n` handle-list reads fail.
    pub fn with_failing_reads(self, n: usize) -> Self {
        self.failing_reads.store(n, Ordering::SeqCst);
        self
    }

    pub fn scroll_count(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }

    fn render(&self) -> usize {
        let mut state = self.state.lock().unwrap();
        if state.visible < state.target {
            state.visible = state.target.min(state.visible.saturating_add(self.render_step));
        }
        state.visible
    }
}

#[async_trait]
impl<H: Clone + Send + Sync> PageSource for ScriptedPage<H> {
    type Handle = H;

    async fn current_item_handles(&self) -> Result<Vec<H>> {
        if take_failure(&self.failing_reads) {
            bail!("scripted handle read failure");
        }
        let visible = self.render();
        Ok(self.items[..visible].to_vec())
    }

    async fn item_count(&self) -> Result<usize> {
        if take_failure(&self.failing_counts) {
            bail!("scripted count failure");
        }
        Ok(self.render())
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.scrolls.fetch_add(1, Ordering::SeqCst);
        if self.failing_scrolls {
            bail!("scripted scroll failure");
        }
        let mut state = self.state.lock().unwrap();
        if let Some(next) = state.targets.pop_front() {
            state.target = state.target.max(next.min(self.items.len()));
        }
        Ok(())
    }

    async fn end_of_list(&self) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(self.end_hint && state.targets.is_empty() && state.visible == state.target)
    }
}

/// Consume one scripted failure, if any remain.
fn take_failure(remaining: &AtomicUsize) -> bool {
    remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

// ---------------------------------------------------------------------------
// ScriptedExtractor
// ---------------------------------------------------------------------------

/// Extractor over integer item ids. Builder pattern: `.failing()`, `.flaky()`,
/// `.hanging()`, `.with_delay()`.
pub struct ScriptedExtractor {
    failing: HashSet<usize>,
    flaky: Mutex<HashSet<usize>>,
    hanging: HashSet<usize>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
    /// In-flight count observed as each extraction started.
    starts: Mutex<Vec<usize>>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self {
            failing: HashSet::new(),
            flaky: Mutex::new(HashSet::new()),
            hanging: HashSet::new(),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            starts: Mutex::new(Vec::new()),
        }
    }

    /// Ids that fail on every attempt.
    pub fn failing(mut self, ids: impl IntoIterator<Item = usize>) -> Self {
        self.failing.extend(ids);
        self
    }

    /// Ids that fail on their first attempt only.
    pub fn flaky(self, ids: impl IntoIterator<Item = usize>) -> Self {
        self.flaky.lock().unwrap().extend(ids);
        self
    }

    /// Ids that never complete.
    pub fn hanging(mut self, ids: impl IntoIterator<Item = usize>) -> Self {
        self.hanging.extend(ids);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Sizes of the concurrent groups, reconstructed from the start log: a
    /// group begins whenever an extraction starts with nothing else in flight.
    pub fn group_sizes(&self) -> Vec<usize> {
        let starts = self.starts.lock().unwrap();
        let mut groups = Vec::new();
        for &in_flight in starts.iter() {
            if in_flight == 1 {
                groups.push(1);
            } else if let Some(last) = groups.last_mut() {
                *last += 1;
            }
        }
        groups
    }
}

impl Default for ScriptedExtractor {
    fn default() -> Self {
        Self::new()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FieldExtractor<usize> for ScriptedExtractor {
    async fn extract(&self, id: &usize) -> std::result::Result<Review, ExtractionError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.starts.lock().unwrap().push(now);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.hanging.contains(id) {
            std::future::pending::<()>().await;
        }
        if self.failing.contains(id) {
            return Err(ExtractionError::MissingElement(format!("item {id}")));
        }
        if self.flaky.lock().unwrap().remove(id) {
            return Err(ExtractionError::Driver(format!("stale element {id}")));
        }
        Ok(review_for(*id))
    }
}

/// The review `ScriptedExtractor` produces for `id`.
pub fn review_for(id: usize) -> Review {
    Review::builder()
        .date(format!("day {id}"))
        .author(format!("user-{id}"))
        .text(format!("review #{id}"))
        .rating(5)
        .build()
}
