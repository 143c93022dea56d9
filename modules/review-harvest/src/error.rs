use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for harvest operations.
pub type Result<T> = std::result::Result<T, HarvestError>;

#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// Harvested reviews could not be persisted. Nothing else holds them, so this is fatal.
    #[error("Failed to write {lost} reviews to {}: {source}", path.display())]
    SinkWrite {
        lost: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to turn one item handle into a review. Never aborts a batch.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Missing element: {0}")]
    MissingElement(String),

    #[error("Malformed item: {0}")]
    Malformed(String),

    #[error("Extraction timed out after {0:?}")]
    Timeout(Duration),

    #[error("Driver error: {0}")]
    Driver(String),
}

impl From<webdriver_client::WebDriverError> for ExtractionError {
    fn from(err: webdriver_client::WebDriverError) -> Self {
        ExtractionError::Driver(err.to_string())
    }
}
