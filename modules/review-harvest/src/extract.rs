use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::ExtractionError;
use crate::review::Review;
use crate::traits::FieldExtractor;

/// Reviews extracted from one tail, plus how many items were dropped.
#[derive(Debug, Default)]
pub struct ExtractionBatch {
    pub reviews: Vec<Review>,
    pub failed: usize,
}

/// Runs a field extractor over a batch of handles, at most `concurrency` at a time.
///
/// Handles are split into consecutive groups; each group runs concurrently and
/// is joined before the next one starts, so peak concurrency never exceeds the
/// limit. Failed or timed-out items are logged and dropped.
pub struct BoundedExtractor<'a, E> {
    extractor: &'a E,
    concurrency: usize,
    task_timeout: Duration,
}

impl<'a, E> BoundedExtractor<'a, E> {
    pub fn new(extractor: &'a E, concurrency: usize, task_timeout: Duration) -> Self {
        Self {
            extractor,
            concurrency: concurrency.max(1),
            task_timeout,
        }
    }

    pub async fn extract<H>(&self, handles: &[H]) -> ExtractionBatch
    where
        H: Send + Sync,
        E: FieldExtractor<H>,
    {
        let mut batch = ExtractionBatch {
            reviews: Vec::with_capacity(handles.len()),
            failed: 0,
        };

        for (group_index, group) in handles.chunks(self.concurrency).enumerate() {
            let offset = group_index * self.concurrency;
            let results = join_all(group.iter().enumerate().map(|(i, handle)| async move {
                let outcome =
                    match tokio::time::timeout(self.task_timeout, self.extractor.extract(handle))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(ExtractionError::Timeout(self.task_timeout)),
                    };
                (offset + i, outcome)
            }))
            .await;

            for (item, outcome) in results {
                match outcome {
                    Ok(review) => batch.reviews.push(review),
                    Err(e) => {
                        warn!(item, error = %e, "Review extraction failed, skipping");
                        batch.failed += 1;
                    }
                }
            }
            debug!(group = group_index, size = group.len(), "Extraction group joined");
        }

        batch
    }
}
