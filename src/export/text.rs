//! Plain text encoder.

use super::{EncodeContext, Encoder, ExportFormat};
use crate::error::Result;
use crate::model::{Question, IMAGE_MARKER};

/// Placeholder written where an image marker stood.
pub const IMAGE_PLACEHOLDER: &str = "[Image]";

/// Width of the `=` rule after each record.
const RULE_WIDTH: usize = 50;

/// Encodes questions as flat UTF-8 text.
///
/// Markers become [`IMAGE_PLACEHOLDER`], an `Images: N` line follows records
/// that have images, and every record ends with a rule.
#[derive(Debug, Clone, Default)]
pub struct TextEncoder;

impl TextEncoder {
    /// Create a new text encoder.
    pub fn new() -> Self {
        Self
    }
}

impl Encoder for TextEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Txt
    }

    fn encode(&self, questions: &[Question], ctx: &mut EncodeContext<'_>) -> Result<Vec<u8>> {
        let mut out = String::new();

        for (index, question) in questions.iter().enumerate() {
            ctx.check_cancelled()?;

            let text = ctx.numbered_text(index, question);
            out.push_str(&text.replace(IMAGE_MARKER, IMAGE_PLACEHOLDER));
            out.push('\n');

            if question.image_count() > 0 {
                out.push_str(&format!("Images: {}\n", question.image_count()));
            }

            out.push('\n');
            out.push_str(&"=".repeat(RULE_WIDTH));
            out.push_str("\n\n");

            ctx.question_done();
        }

        Ok(out.into_bytes())
    }
}
