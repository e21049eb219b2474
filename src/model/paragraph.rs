//! Paragraph and inline-level types.

use serde::{Deserialize, Serialize};

/// A source paragraph as read from the document body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Inline content in document order
    pub content: Vec<InlineContent>,
}

impl Paragraph {
    /// Create a new empty paragraph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a paragraph with plain text.
    pub fn with_text(text: impl Into<String>) -> Self {
        let mut p = Self::new();
        p.add_text(text);
        p
    }

    /// Add plain text to the paragraph.
    ///
    /// Adjacent text is merged into a single run.
    pub fn add_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        if let Some(InlineContent::Text(last)) = self.content.last_mut() {
            last.push_str(&text);
        } else {
            self.content.push(InlineContent::Text(text));
        }
    }

    /// Add a tab character.
    pub fn add_tab(&mut self) {
        self.content.push(InlineContent::Tab);
    }

    /// Add a line break.
    pub fn add_line_break(&mut self) {
        self.content.push(InlineContent::LineBreak);
    }

    /// Add an image anchor referencing a package relationship.
    pub fn add_image(&mut self, rel_id: impl Into<String>) {
        self.content.push(InlineContent::Image {
            rel_id: rel_id.into(),
        });
    }

    /// Builder form of [`Paragraph::add_image`].
    pub fn with_image(mut self, rel_id: impl Into<String>) -> Self {
        self.add_image(rel_id);
        self
    }

    /// Get plain text content of the paragraph.
    pub fn plain_text(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                InlineContent::Text(text) => text.as_str(),
                InlineContent::Tab => "\t",
                InlineContent::LineBreak => "\n",
                InlineContent::Image { .. } => "",
            })
            .collect()
    }

    /// Relationship ids of image anchors, in the order they appear.
    pub fn image_refs(&self) -> Vec<&str> {
        self.content
            .iter()
            .filter_map(|c| match c {
                InlineContent::Image { rel_id } => Some(rel_id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Check if the paragraph has any image anchors.
    pub fn has_images(&self) -> bool {
        self.content
            .iter()
            .any(|c| matches!(c, InlineContent::Image { .. }))
    }

    /// Check if the paragraph has no visible text.
    pub fn is_blank(&self) -> bool {
        self.plain_text().trim().is_empty()
    }
}

/// Inline content within a paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InlineContent {
    /// A run of text
    Text(String),

    /// A tab stop
    Tab,

    /// A line break within the paragraph
    LineBreak,

    /// An embedded image anchor
    Image {
        /// Relationship id resolving to the image part
        rel_id: String,
    },
}
