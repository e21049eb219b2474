//! JSON encoder.

use super::layout::{max_image_height_px, SCREEN_DPI};
use super::{EncodeContext, Encoder, ExportFormat, JsonFormat};
use crate::error::Result;
use crate::imaging::TargetEncoding;
use crate::model::Question;
use base64::Engine as _;
use serde::Serialize;

#[derive(Serialize)]
struct JsonExport {
    total_questions: usize,
    questions: Vec<JsonQuestion>,
}

#[derive(Serialize)]
struct JsonQuestion {
    number: Option<usize>,
    text: String,
    images_count: usize,
    images: Vec<JsonImage>,
}

#[derive(Serialize)]
struct JsonImage {
    index: usize,
    data: String,
    size: usize,
}

/// Encodes questions as JSON records with base64 PNG images.
#[derive(Debug, Clone, Default)]
pub struct JsonEncoder;

impl JsonEncoder {
    /// Create a new JSON encoder.
    pub fn new() -> Self {
        Self
    }

    fn encode_images(&self, question: &Question, ctx: &mut EncodeContext<'_>) -> Vec<JsonImage> {
        if !ctx.options().include_images {
            ctx.summary.add_omitted(question.image_count());
            return Vec::new();
        }

        let max_height = max_image_height_px(SCREEN_DPI);
        let prepared = ctx.prepare_images(question, u32::MAX, max_height, TargetEncoding::Png);

        prepared
            .into_iter()
            .enumerate()
            .map(|(i, result)| match result {
                Ok(image) => {
                    ctx.summary.add_image(&image);
                    JsonImage {
                        index: i + 1,
                        data: base64::engine::general_purpose::STANDARD.encode(&image.asset.data),
                        size: image.asset.size(),
                    }
                }
                Err(e) => {
                    log::warn!("Image {} could not be encoded: {}", i + 1, e);
                    ctx.summary.add_replaced();
                    JsonImage {
                        index: i + 1,
                        data: String::new(),
                        size: 0,
                    }
                }
            })
            .collect()
    }
}

impl Encoder for JsonEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn encode(&self, questions: &[Question], ctx: &mut EncodeContext<'_>) -> Result<Vec<u8>> {
        let mut records = Vec::with_capacity(questions.len());

        for (index, question) in questions.iter().enumerate() {
            ctx.check_cancelled()?;

            let number = ctx.options().numbering.is_sequential().then_some(index + 1);
            let text = ctx.numbered_text(index, question);
            let images = self.encode_images(question, ctx);

            records.push(JsonQuestion {
                number,
                text,
                images_count: question.image_count(),
                images,
            });
            ctx.question_done();
        }

        let export = JsonExport {
            total_questions: records.len(),
            questions: records,
        };

        let bytes = match ctx.options().json_format {
            JsonFormat::Pretty => serde_json::to_vec_pretty(&export)?,
            JsonFormat::Compact => serde_json::to_vec(&export)?,
        };
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{ExportEngine, ExportOptions, NoProgress};
    use crate::model::{ImageAsset, ImageFormat};
    use image::{DynamicImage, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_asset(width: u32, height: u32) -> ImageAsset {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([1, 2, 3])))
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();
        ImageAsset::new(buffer.into_inner(), ImageFormat::Png, width, height)
    }

    fn encode(questions: &[Question], options: &ExportOptions) -> (serde_json::Value, crate::export::ExportSummary) {
        let engine = ExportEngine::with_defaults();
        let (bytes, summary) = engine.encode(questions, options, &mut NoProgress).unwrap();
        (serde_json::from_slice(&bytes).unwrap(), summary)
    }

    #[test]
    fn test_json_schema() {
        let questions = vec![
            Question::text_only("Aufgabe 5\nText"),
            Question::new("Aufgabe 9\n[BILD]", vec![png_asset(10, 600)]).unwrap(),
        ];
        let options = ExportOptions::new(ExportFormat::Json).sequential();
        let (json, summary) = encode(&questions, &options);

        assert_eq!(json["total_questions"], 2);
        assert_eq!(json["questions"][0]["number"], 1);
        assert_eq!(json["questions"][0]["text"], "Aufgabe 1\nText");
        assert_eq!(json["questions"][0]["images_count"], 0);
        assert_eq!(json["questions"][1]["text"], "Aufgabe 2\n[BILD]");

        let image = &json["questions"][1]["images"][0];
        assert_eq!(image["index"], 1);
        let data = base64::engine::general_purpose::STANDARD
            .decode(image["data"].as_str().unwrap())
            .unwrap();
        assert_eq!(image["size"], data.len());
        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!(decoded.height(), 280);
        assert_eq!(summary.images_scaled, 1);
    }

    #[test]
    fn test_number_null_in_original_mode() {
        let questions = vec![Question::text_only("Aufgabe 5")];
        let (json, _) = encode(&questions, &ExportOptions::new(ExportFormat::Json));
        assert!(json["questions"][0]["number"].is_null());
        assert_eq!(json["questions"][0]["text"], "Aufgabe 5");
    }

    #[test]
    fn test_failed_image_entry() {
        let broken = ImageAsset::new(b"junk".to_vec(), ImageFormat::Bmp, 4, 400);
        let questions = vec![Question::new("[BILD]", vec![broken]).unwrap()];
        let (json, summary) = encode(&questions, &ExportOptions::new(ExportFormat::Json));
        let image = &json["questions"][0]["images"][0];
        assert_eq!(image["data"], "");
        assert_eq!(image["size"], 0);
        assert_eq!(summary.images_replaced, 1);
    }

    #[test]
    fn test_images_disabled() {
        let questions = vec![Question::new("a\n[BILD]", vec![png_asset(2, 2)]).unwrap()];
        let options = ExportOptions::new(ExportFormat::Json).with_images(false);
        let (json, summary) = encode(&questions, &options);
        assert_eq!(json["questions"][0]["images_count"], 1);
        assert_eq!(json["questions"][0]["images"].as_array().unwrap().len(), 0);
        assert_eq!(summary.images_omitted, 1);
    }

    #[test]
    fn test_compact_is_single_line() {
        let questions = vec![Question::text_only("x")];
        let engine = ExportEngine::with_defaults();
        let options = ExportOptions::new(ExportFormat::Json).with_json_format(JsonFormat::Compact);
        let (bytes, _) = engine.encode(&questions, &options, &mut NoProgress).unwrap();
        assert!(!bytes.contains(&b'\n'));
    }
}
