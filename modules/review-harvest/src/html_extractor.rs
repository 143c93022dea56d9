//! Field extraction from one review item's HTML.
//!
//! All knowledge of the review page markup lives in [`ReviewSelectors`].

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractionError;
use crate::review::{Review, RATING_FAILED, RATING_UNPARSED};
use crate::traits::FieldExtractor;

/// CSS selectors for the review list markup.
#[derive(Debug, Clone)]
pub struct ReviewSelectors {
    pub item: String,
    pub date: String,
    pub author: String,
    pub text: String,
    pub pros: String,
    pub cons: String,
    pub rating: String,
    pub photo: String,
    pub video: String,
    pub tag: String,
    pub purchase_state: String,
}

impl Default for ReviewSelectors {
    fn default() -> Self {
        Self {
            item: ".comments__item.feedback".to_string(),
            date: ".feedback__date".to_string(),
            author: ".feedback__header".to_string(),
            text: ".feedback__text".to_string(),
            pros: ".feedback__text--item-pro".to_string(),
            cons: ".feedback__text--item-con".to_string(),
            rating: ".feedback__rating".to_string(),
            photo: ".feedback__photo img".to_string(),
            video: ".feedback__video-btn".to_string(),
            tag: ".feedbacks-bables__item".to_string(),
            purchase_state: ".feedback__state--text".to_string(),
        }
    }
}

/// Star markers checked in order against the rating element's class list.
const STAR_CLASSES: [(&str, u8); 5] = [
    ("star5", 5),
    ("star4", 4),
    ("star3", 3),
    ("star2", 2),
    ("star1", 1),
];

struct Compiled {
    date: Selector,
    author: Selector,
    text: Selector,
    pros: Selector,
    cons: Selector,
    rating: Selector,
    photo: Selector,
    video: Selector,
    tag: Selector,
    purchase_state: Selector,
}

/// Parses review items from their `outerHTML`.
pub struct HtmlReviewExtractor {
    selectors: Compiled,
}

impl HtmlReviewExtractor {
    pub fn new(selectors: &ReviewSelectors) -> Result<Self> {
        Ok(Self {
            selectors: Compiled {
                date: parse_selector(&selectors.date)?,
                author: parse_selector(&selectors.author)?,
                text: parse_selector(&selectors.text)?,
                pros: parse_selector(&selectors.pros)?,
                cons: parse_selector(&selectors.cons)?,
                rating: parse_selector(&selectors.rating)?,
                photo: parse_selector(&selectors.photo)?,
                video: parse_selector(&selectors.video)?,
                tag: parse_selector(&selectors.tag)?,
                purchase_state: parse_selector(&selectors.purchase_state)?,
            },
        })
    }

    /// Build a review from one item's markup.
    pub fn parse(&self, html: &str) -> Result<Review, ExtractionError> {
        if html.trim().is_empty() {
            return Err(ExtractionError::Malformed("empty item markup".to_string()));
        }
        let fragment = Html::parse_fragment(html);
        let root = fragment
            .root_element()
            .children()
            .find_map(ElementRef::wrap)
            .ok_or_else(|| ExtractionError::MissingElement("review item root".to_string()))?;

        let s = &self.selectors;
        let photos = root.select(&s.photo).count();
        let videos = root.select(&s.video).count();

        let mut tags = texts(root, &s.tag);
        tags.extend(texts(root, &s.purchase_state));

        Ok(Review {
            date: first_text(root, &s.date),
            author: first_text(root, &s.author),
            text: body_text(root, [&s.text, &s.pros, &s.cons]),
            rating: rating(root, &s.rating),
            photo_count: u32::try_from(photos.saturating_sub(videos)).unwrap_or(u32::MAX),
            has_video: videos > 0,
            tags,
        })
    }
}

#[async_trait]
impl FieldExtractor<String> for HtmlReviewExtractor {
    async fn extract(&self, html: &String) -> Result<Review, ExtractionError> {
        self.parse(html)
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector {css:?}: {e}"))
}

/// Collapse all whitespace runs to single spaces and trim.
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: ElementRef) -> String {
    normalize(&el.text().collect::<String>())
}

fn first_text(root: ElementRef, selector: &Selector) -> Option<String> {
    root.select(selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

fn texts(root: ElementRef, selector: &Selector) -> Vec<String> {
    root.select(selector)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Main text, pros and cons: each section space-joined, sections joined with ". ".
fn body_text(root: ElementRef, sections: [&Selector; 3]) -> Option<String> {
    let parts: Vec<String> = sections
        .into_iter()
        .map(|selector| texts(root, selector).join(" "))
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(normalize(&parts.join(". ")))
    }
}

fn rating(root: ElementRef, selector: &Selector) -> u8 {
    let Some(element) = root.select(selector).next() else {
        return RATING_FAILED;
    };
    let class = element.value().attr("class").unwrap_or_default();
    STAR_CLASSES
        .iter()
        .find(|(marker, _)| class.contains(*marker))
        .map(|&(_, stars)| stars)
        .unwrap_or(RATING_UNPARSED)
}
