//! Live browser implementations of the page and extractor seams.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;
use webdriver_client::{ElementRef, Session};

use crate::error::ExtractionError;
use crate::html_extractor::{HtmlReviewExtractor, ReviewSelectors};
use crate::review::Review;
use crate::traits::{FieldExtractor, PageSource};

const COUNT_SCRIPT: &str = "return document.querySelectorAll(arguments[0]).length;";
const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// The review list rendered in one browser tab.
pub struct WebDriverPageSource {
    session: Session,
    item_selector: String,
}

impl WebDriverPageSource {
    pub fn new(session: Session, item_selector: impl Into<String>) -> Self {
        Self {
            session,
            item_selector: item_selector.into(),
        }
    }

    /// Navigate the tab to the review page.
    pub async fn open(&self, url: &str) -> Result<()> {
        info!(url, "Opening review page");
        self.session
            .navigate(url)
            .await
            .with_context(|| format!("Failed to open {url}"))
    }
}

#[async_trait]
impl PageSource for WebDriverPageSource {
    type Handle = ElementRef;

    async fn current_item_handles(&self) -> Result<Vec<ElementRef>> {
        self.session
            .find_elements(&self.item_selector)
            .await
            .context("Failed to list review items")
    }

    async fn item_count(&self) -> Result<usize> {
        let value = self
            .session
            .execute(COUNT_SCRIPT, vec![json!(self.item_selector)])
            .await
            .context("Failed to count review items")?;
        match value {
            Value::Number(n) => n
                .as_u64()
                .map(|n| n as usize)
                .context("Item count is not a non-negative integer"),
            other => anyhow::bail!("Item count script returned {other}"),
        }
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.session
            .execute(SCROLL_SCRIPT, Vec::new())
            .await
            .context("Failed to scroll")?;
        Ok(())
    }
}

/// Reads each item's `outerHTML` from the browser and parses it locally.
pub struct WebDriverReviewExtractor {
    session: Session,
    html: HtmlReviewExtractor,
}

impl WebDriverReviewExtractor {
    pub fn new(session: Session, selectors: &ReviewSelectors) -> Result<Self> {
        Ok(Self {
            session,
            html: HtmlReviewExtractor::new(selectors)?,
        })
    }
}

#[async_trait]
impl FieldExtractor<ElementRef> for WebDriverReviewExtractor {
    async fn extract(&self, handle: &ElementRef) -> Result<Review, ExtractionError> {
        let markup = self.session.outer_html(handle).await.map_err(|e| {
            if e.is_stale_element() {
                ExtractionError::MissingElement(format!("item {} detached", handle.id()))
            } else {
                ExtractionError::from(e)
            }
        })?;
        self.html.parse(&markup)
    }
}
