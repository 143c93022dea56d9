use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::error::{HarvestError, Result};
use crate::review::{Review, CSV_HEADER};
use crate::traits::ReviewSink;

const WRITE_BUFFER_BYTES: usize = 32 * 1024;

/// Write the header and one line per review.
///
/// Below `parallel_threshold` lines are written in input order. At or above it
/// lines are rendered on the rayon pool and written through a shared locked
/// writer, so their order is not preserved.
pub fn write_reviews<W: Write + Send>(
    writer: W,
    reviews: &[Review],
    parallel_threshold: usize,
) -> io::Result<()> {
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_BYTES, writer);
    writer.write_all(CSV_HEADER.as_bytes())?;
    writer.write_all(b"\n")?;

    if reviews.len() >= parallel_threshold {
        let shared = Mutex::new(writer);
        reviews.par_iter().try_for_each(|review| {
            let mut line = review.to_csv_line();
            line.push('\n');
            let mut guard = shared
                .lock()
                .map_err(|_| io::Error::other("CSV writer lock poisoned"))?;
            guard.write_all(line.as_bytes())
        })?;
        writer = shared
            .into_inner()
            .map_err(|_| io::Error::other("CSV writer lock poisoned"))?;
    } else {
        for review in reviews {
            writer.write_all(review.to_csv_line().as_bytes())?;
            writer.write_all(b"\n")?;
        }
    }

    writer.flush()
}

/// CSV file destination. Existing content at `path` is replaced.
pub struct CsvFileSink {
    path: PathBuf,
    parallel_threshold: usize,
}

impl CsvFileSink {
    pub fn new(path: impl AsRef<Path>, parallel_threshold: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            parallel_threshold,
        }
    }
}

#[async_trait]
impl ReviewSink for CsvFileSink {
    async fn write(&self, reviews: &[Review]) -> Result<()> {
        if reviews.is_empty() {
            if self.path.exists() {
                warn!(
                    path = %self.path.display(),
                    "No reviews to save, file from a previous run left unchanged"
                );
            } else {
                warn!(path = %self.path.display(), "No reviews to save");
            }
            return Ok(());
        }

        let started = Instant::now();
        let path = self.path.clone();
        let owned = reviews.to_vec();
        let threshold = self.parallel_threshold;

        let outcome = tokio::task::spawn_blocking(move || {
            let file = File::create(&path)?;
            write_reviews(file, &owned, threshold)
        })
        .await
        .unwrap_or_else(|e| Err(io::Error::other(e)));

        match outcome {
            Ok(()) => {
                info!(
                    count = reviews.len(),
                    path = %self.path.display(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Reviews saved"
                );
                Ok(())
            }
            Err(source) => {
                error!(
                    lost = reviews.len(),
                    path = %self.path.display(),
                    error = %source,
                    "Failed to save reviews"
                );
                Err(HarvestError::SinkWrite {
                    lost: reviews.len(),
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }
}
