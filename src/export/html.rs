//! HTML encoder.

use super::layout::{max_image_height_px, SCREEN_DPI};
use super::{EncodeContext, Encoder, ExportFormat};
use crate::error::Result;
use crate::imaging::TargetEncoding;
use crate::model::{Question, IMAGE_MARKER};
use base64::Engine as _;
use quick_xml::escape::escape;

const HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>Questions</title>
<style>
body { font-family: Arial, sans-serif; margin: 40px; }
.question { margin-bottom: 40px; border-bottom: 1px solid #ddd; padding-bottom: 20px; }
.question-text { margin-bottom: 15px; line-height: 1.6; white-space: pre-wrap; }
.image-container { margin: 15px 0; text-align: center; }
.image-container img { max-width: 600px; max-height: 400px; border: 1px solid #ddd; }
.separator { border-top: 2px dashed #ccc; margin: 30px 0; }
</style>
</head>
<body>
<h1>Questions</h1>
"#;

const TAIL: &str = "</body>\n</html>\n";

/// Encodes questions as one self-contained HTML page.
///
/// Images are inlined as base64 PNG data URIs.
#[derive(Debug, Clone, Default)]
pub struct HtmlEncoder;

impl HtmlEncoder {
    /// Create a new HTML encoder.
    pub fn new() -> Self {
        Self
    }

    fn write_question(
        &self,
        out: &mut String,
        index: usize,
        question: &Question,
        ctx: &mut EncodeContext<'_>,
    ) {
        let text = ctx.numbered_text(index, question);
        let include_images = ctx.options().include_images;
        let prepared = if include_images {
            ctx.prepare_images(
                question,
                u32::MAX,
                max_image_height_px(SCREEN_DPI),
                TargetEncoding::Png,
            )
        } else {
            ctx.summary.add_omitted(question.image_count());
            Vec::new()
        };
        let mut prepared = prepared.into_iter();

        out.push_str("<div class=\"question\">\n<div class=\"question-text\">");

        let segments: Vec<&str> = text.split(IMAGE_MARKER).collect();
        let image_slots = segments.len() - 1;
        for (i, segment) in segments.into_iter().enumerate() {
            if !segment.trim().is_empty() {
                out.push_str(&escape(segment).replace('\n', "<br>"));
            }
            if i >= image_slots || !include_images {
                continue;
            }

            match prepared.next() {
                Some(Ok(image)) => {
                    ctx.summary.add_image(&image);
                    out.push_str(&format!(
                        "\n<div class=\"image-container\"><img src=\"data:image/png;base64,{}\" alt=\"Image {}\"></div>\n",
                        base64::engine::general_purpose::STANDARD.encode(&image.asset.data),
                        i + 1
                    ));
                }
                Some(Err(e)) => {
                    log::warn!("Image {} could not be embedded: {}", i + 1, e);
                    ctx.summary.add_replaced();
                    out.push_str(&format!("<div>[Image {}]</div>", i + 1));
                }
                None => {}
            }
        }

        out.push_str("</div>\n</div>\n");
    }
}

impl Encoder for HtmlEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Html
    }

    fn encode(&self, questions: &[Question], ctx: &mut EncodeContext<'_>) -> Result<Vec<u8>> {
        let mut out = String::from(HEAD);

        for (index, question) in questions.iter().enumerate() {
            ctx.check_cancelled()?;

            self.write_question(&mut out, index, question, ctx);
            if index + 1 < questions.len() {
                out.push_str("<div class=\"separator\"></div>\n");
            }

            ctx.question_done();
        }

        out.push_str(TAIL);
        Ok(out.into_bytes())
    }
}
