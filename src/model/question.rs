//! Question records.

use super::ImageAsset;
use serde::{Deserialize, Serialize};

/// Inline marker denoting an image position inside question text.
pub const IMAGE_MARKER: &str = "[BILD]";

/// A delimited question: text segments interleaved with images.
///
/// `text` holds the segments joined by [`IMAGE_MARKER`]; segment `i`
/// precedes image `i`. The number of markers always equals the number of
/// images. Questions are immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionRecord")]
pub struct Question {
    text: String,
    images: Vec<ImageAsset>,
}

/// Unchecked serialized form of a [`Question`].
#[derive(Deserialize)]
struct QuestionRecord {
    text: String,
    images: Vec<ImageAsset>,
}

impl TryFrom<QuestionRecord> for Question {
    type Error = String;

    fn try_from(record: QuestionRecord) -> Result<Self, Self::Error> {
        let markers = record.text.matches(IMAGE_MARKER).count();
        let images = record.images.len();
        Question::new(record.text, record.images)
            .ok_or_else(|| format!("{} image markers but {} images", markers, images))
    }
}

impl Question {
    /// Build a question from already-joined text and its images.
    ///
    /// Returns `None` when the marker count does not match the image count.
    pub fn new(text: impl Into<String>, images: Vec<ImageAsset>) -> Option<Self> {
        let text = text.into();
        if text.matches(IMAGE_MARKER).count() != images.len() {
            return None;
        }
        Some(Self { text, images })
    }

    /// Build a question from buffered lines, joined by newline.
    pub(crate) fn from_lines(lines: Vec<String>, images: Vec<ImageAsset>) -> Self {
        let text = lines.join("\n");
        debug_assert_eq!(text.matches(IMAGE_MARKER).count(), images.len());
        Self { text, images }
    }

    /// Build a text-only question.
    pub fn text_only(text: impl Into<String>) -> Self {
        let text: String = text.into();
        let text = text.replace(IMAGE_MARKER, "");
        Self {
            text,
            images: Vec::new(),
        }
    }

    /// Full text including image markers.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Images in marker order.
    pub fn images(&self) -> &[ImageAsset] {
        &self.images
    }

    /// Number of images.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Number of image markers in the text.
    pub fn marker_count(&self) -> usize {
        self.text.matches(IMAGE_MARKER).count()
    }

    /// Text segments between markers; always `image_count() + 1` long.
    pub fn segments(&self) -> Vec<&str> {
        self.text.split(IMAGE_MARKER).collect()
    }

    /// First non-blank line, used as a short title.
    pub fn title(&self) -> &str {
        self.text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && *line != IMAGE_MARKER)
            .unwrap_or("")
    }

    /// Case-insensitive substring search over the text.
    pub fn matches(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.text.to_lowercase().contains(&needle.to_lowercase())
    }
}
