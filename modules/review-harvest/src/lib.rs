pub mod config;
pub mod error;
pub mod extract;
pub mod harvester;
pub mod html_extractor;
pub mod review;
pub mod scroll;
pub mod session;
pub mod sink;
pub mod stability;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod webdriver;

pub use config::HarvestConfig;
pub use error::{ExtractionError, HarvestError};
pub use harvester::{DedupStrategy, HarvestReport, Harvester};
pub use review::Review;
pub use session::{HarvestLimits, HarvestPhase, HarvestSession};
pub use sink::CsvFileSink;
