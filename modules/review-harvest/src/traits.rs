// Collaborator seams for the harvest loop.
//
// PageSource: the rendered, growing list of review items (one browser tab).
// FieldExtractor: turns one item handle into a Review.
// ReviewSink: persists the finished batch.
//
// The loop only ever talks to these traits, so scripted fakes in `testing`
// drive it deterministically without a browser.

use anyhow::Result;
use async_trait::async_trait;

use crate::error::ExtractionError;
use crate::review::Review;

#[async_trait]
pub trait PageSource: Send + Sync {
    /// Opaque reference to one rendered item, valid for the current snapshot.
    type Handle: Send + Sync;

    /// Ordered snapshot of every rendered item. May grow between calls; never
    /// shrinks or reorders entries already returned.
    async fn current_item_handles(&self) -> Result<Vec<Self::Handle>>;

    /// Number of rendered items. Polled by the stability detector.
    async fn item_count(&self) -> Result<usize> {
        Ok(self.current_item_handles().await?.len())
    }

    /// Scroll to the current bottom. Completion is not signalled; callers poll.
    async fn scroll_to_bottom(&self) -> Result<()>;

    /// Whether the source knows the list is complete. Most pages cannot tell.
    async fn end_of_list(&self) -> Result<bool> {
        Ok(false)
    }
}

#[async_trait]
pub trait FieldExtractor<H: Send + Sync>: Send + Sync {
    /// Extract one review. Missing optional fields are left empty; only a
    /// missing or malformed item fails.
    async fn extract(&self, handle: &H) -> std::result::Result<Review, ExtractionError>;
}

#[async_trait]
pub trait ReviewSink: Send + Sync {
    async fn write(&self, reviews: &[Review]) -> crate::error::Result<()>;
}
