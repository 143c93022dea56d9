use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use typed_builder::TypedBuilder;

use crate::harvester::DedupStrategy;
use crate::session::HarvestLimits;

pub const DEFAULT_PAGE_URL: &str =
    "https://www.wildberries.ru/catalog/521896959/feedbacks?imtId=234818091&size=720932801";
pub const DEFAULT_OUTPUT: &str = "wildberries_reviews.csv";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Harvest configuration. Every field has a default; `from_env` overrides them.
#[derive(Debug, Clone, TypedBuilder)]
pub struct HarvestConfig {
    #[builder(default = DEFAULT_PAGE_URL.to_string(), setter(into))]
    pub page_url: String,
    /// Upper bound for one stability wait and for one item extraction.
    #[builder(default = Duration::from_secs(10))]
    pub wait_timeout: Duration,
    #[builder(default = Duration::from_millis(500))]
    pub poll_interval: Duration,
    #[builder(default = 5)]
    pub max_scroll_attempts: u32,
    #[builder(default = 3)]
    pub max_consecutive_empty: u32,
    /// Extractions in flight at once.
    #[builder(default = 5)]
    pub concurrency: usize,
    #[builder(default = PathBuf::from(DEFAULT_OUTPUT), setter(into))]
    pub output_path: PathBuf,
    /// Review count at which the CSV is written from parallel tasks.
    #[builder(default = 2000)]
    pub parallel_write_threshold: usize,
    #[builder(default)]
    pub dedup: DedupStrategy,
    #[builder(default = DEFAULT_WEBDRIVER_URL.to_string(), setter(into))]
    pub webdriver_url: String,
    #[builder(default = true)]
    pub headless: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl HarvestConfig {
    /// Load configuration from `REVIEW_*` / `WEBDRIVER_*` environment variables
    /// (and `.env` if present). Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            page_url: env::var("REVIEW_PAGE_URL").unwrap_or(defaults.page_url),
            wait_timeout: Duration::from_secs(env_or(
                "REVIEW_WAIT_SECONDS",
                defaults.wait_timeout.as_secs(),
            )?),
            poll_interval: Duration::from_millis(non_zero(
                "REVIEW_POLL_INTERVAL_MS",
                env_or("REVIEW_POLL_INTERVAL_MS", defaults.poll_interval.as_millis() as u64)?,
            )?),
            max_scroll_attempts: env_or("REVIEW_MAX_SCROLL_ATTEMPTS", defaults.max_scroll_attempts)?,
            max_consecutive_empty: env_or(
                "REVIEW_MAX_CONSECUTIVE_EMPTY",
                defaults.max_consecutive_empty,
            )?,
            concurrency: env_or("REVIEW_CONCURRENCY", defaults.concurrency)?,
            output_path: env::var("REVIEW_OUTPUT")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_path),
            parallel_write_threshold: env_or(
                "REVIEW_PARALLEL_WRITE_THRESHOLD",
                defaults.parallel_write_threshold,
            )?,
            dedup: env_or("REVIEW_DEDUP", defaults.dedup)?,
            webdriver_url: env::var("WEBDRIVER_URL").unwrap_or(defaults.webdriver_url),
            headless: env_or("WEBDRIVER_HEADLESS", defaults.headless)?,
        };

        Ok(config)
    }

    pub fn limits(&self) -> HarvestLimits {
        HarvestLimits {
            max_scroll_attempts: self.max_scroll_attempts,
            max_consecutive_empty: self.max_consecutive_empty,
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  REVIEW_PAGE_URL: {}", self.page_url);
        tracing::info!("  REVIEW_WAIT_SECONDS: {}", self.wait_timeout.as_secs());
        tracing::info!("  REVIEW_POLL_INTERVAL_MS: {}", self.poll_interval.as_millis());
        tracing::info!("  REVIEW_MAX_SCROLL_ATTEMPTS: {}", self.max_scroll_attempts);
        tracing::info!("  REVIEW_MAX_CONSECUTIVE_EMPTY: {}", self.max_consecutive_empty);
        tracing::info!("  REVIEW_CONCURRENCY: {}", self.concurrency);
        tracing::info!("  REVIEW_OUTPUT: {}", self.output_path.display());
        tracing::info!(
            "  REVIEW_PARALLEL_WRITE_THRESHOLD: {}",
            self.parallel_write_threshold
        );
        tracing::info!("  REVIEW_DEDUP: {}", self.dedup);
        tracing::info!("  WEBDRIVER_URL: {}", self.webdriver_url);
        tracing::info!("  WEBDRIVER_HEADLESS: {}", self.headless);
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

/// Values used as a timer period must be non-zero.
fn non_zero(key: &str, value: u64) -> Result<u64> {
    if value == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(value)
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("{key} has invalid value {raw:?}: {e}"))
}
