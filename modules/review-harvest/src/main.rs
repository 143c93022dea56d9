use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use review_harvest::html_extractor::ReviewSelectors;
use review_harvest::stability::StabilityDetector;
use review_harvest::webdriver::{WebDriverPageSource, WebDriverReviewExtractor};
use review_harvest::{CsvFileSink, HarvestConfig, HarvestReport, Harvester};
use webdriver_client::{ChromeOptions, Session, WebDriverClient};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("review_harvest=info".parse()?))
        .init();

    info!("Review harvester starting...");

    let config = HarvestConfig::from_env()?;
    config.log_summary();

    let client = WebDriverClient::new(&config.webdriver_url)?;
    let options = ChromeOptions {
        headless: config.headless,
        ..ChromeOptions::default()
    };
    let session = client.new_session(&options).await?;
    info!(session_id = session.id(), "Browser session started");

    // The browser must be closed whether or not the harvest succeeded.
    let outcome = harvest_page(&config, session.clone()).await;
    if let Err(e) = session.close().await {
        warn!(error = %e, "Failed to close browser session");
    }

    let report = outcome?;
    info!(
        phase = ?report.session.phase,
        reviews = report.reviews.len(),
        cycles = report.cycles.len(),
        attempts = report.session.attempts,
        "Harvest finished"
    );
    Ok(())
}

async fn harvest_page(config: &HarvestConfig, session: Session) -> Result<HarvestReport> {
    let selectors = ReviewSelectors::default();
    let source = WebDriverPageSource::new(session.clone(), selectors.item.clone());
    source.open(&config.page_url).await?;

    let detector = StabilityDetector::new(&source, config.poll_interval);
    // An empty first render is not fatal; the scroll loop will wait again.
    detector.await_any_items(config.wait_timeout).await;

    let extractor = WebDriverReviewExtractor::new(session, &selectors)?;
    let sink = CsvFileSink::new(&config.output_path, config.parallel_write_threshold);
    let harvester = Harvester::new(source, extractor, config.clone());

    Ok(harvester.run(&sink).await?)
}
