//! Review record and its CSV rendering.
//!
//! Absence is `None`/empty internally; the sentinel strings below only appear
//! in the exported CSV, where downstream consumers expect them verbatim.

use sha2::{Digest, Sha256};
use typed_builder::TypedBuilder;

pub const DATE_SENTINEL: &str = "Дата не указана";
pub const AUTHOR_SENTINEL: &str = "Автор не указана";
pub const TEXT_SENTINEL: &str = "Нет текста";
pub const TAGS_SENTINEL: &str = "Нет тегов";

/// Rating recorded when the rating element is missing entirely.
pub const RATING_FAILED: u8 = 0;
/// Rating recorded when the rating element exists but carries no star marker.
pub const RATING_UNPARSED: u8 = 5;

/// Replaces literal commas in free text so every line splits into exactly 7 fields.
pub const COMMA_GLYPH: char = '\u{FF0C}';

pub const CSV_HEADER: &str = "\"Дата публикации\",\"Автор\",\"Текст отзыва\",\"Оценка\",\"Количество фотографий\",\"Наличие видео\",\"Теги\"";

/// One harvested review. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct Review {
    #[builder(default, setter(strip_option, into))]
    pub(crate) date: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub(crate) author: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub(crate) text: Option<String>,
    pub(crate) rating: u8,
    #[builder(default)]
    pub(crate) photo_count: u32,
    #[builder(default)]
    pub(crate) has_video: bool,
    #[builder(default)]
    pub(crate) tags: Vec<String>,
}

impl Review {
    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }

    pub fn photo_count(&self) -> u32 {
        self.photo_count
    }

    pub fn has_video(&self) -> bool {
        self.has_video
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Tags as exported: `"; "`-joined, or the sentinel when there are none.
    pub fn tags_display(&self) -> String {
        if self.tags.is_empty() {
            TAGS_SENTINEL.to_string()
        } else {
            self.tags.join("; ")
        }
    }

    /// Render one CSV data line (no trailing newline).
    ///
    /// Text fields are quoted with inner quotes doubled and commas swapped for
    /// [`COMMA_GLYPH`]; numeric and boolean fields are bare. Line breaks become spaces.
    pub fn to_csv_line(&self) -> String {
        let line = format!(
            "{},{},{},{},{},{},{}",
            quote(self.date().unwrap_or(DATE_SENTINEL)),
            quote(self.author().unwrap_or(AUTHOR_SENTINEL)),
            quote(self.text().unwrap_or(TEXT_SENTINEL)),
            self.rating,
            self.photo_count,
            self.has_video,
            quote(&self.tags_display()),
        );
        line.replace(&['\r', '\n'][..], " ")
    }

    /// Stable identity derived from date, author and text (hex SHA-256).
    pub fn content_key(&self) -> String {
        let mut hasher = Sha256::new();
        // Present fields are tagged 0x01, absent ones 0x00, so `None` and `Some("")` differ.
        for part in [self.date(), self.author(), self.text()] {
            match part {
                Some(value) => {
                    hasher.update([0x01]);
                    hasher.update(value.as_bytes());
                }
                None => hasher.update([0x00]),
            }
            hasher.update([0x1f]);
        }
        hex::encode(hasher.finalize())
    }
}

fn quote(field: &str) -> String {
    let escaped = field.replace('"', "\"\"").replace(',', &COMMA_GLYPH.to_string());
    format!("\"{escaped}\"")
}
