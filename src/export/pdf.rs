//! PDF encoder built on the lopdf object model.
//!
//! Text is set in the standard Helvetica font with WinAnsi encoding, so no
//! font program is embedded. Images become FlateDecode image XObjects with a
//! soft mask when they carry alpha.

use super::layout::{max_image_height_px, Margins, A4_HEIGHT_PT, A4_WIDTH_PT, PDF_DPI};
use super::{EncodeContext, Encoder, ExportFormat};
use crate::error::Result;
use crate::imaging::{ImageProcessor, PreparedImage, TargetEncoding};
use crate::model::{Question, IMAGE_MARKER};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{DynamicImage, GenericImageView};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::io::Write;

const FONT_NAME: &str = "F1";
const FONT_SIZE: f32 = 11.0;
const LINE_STEP: f32 = 15.0;
const BLANK_LINE_STEP: f32 = 10.0;

// Space that must remain above the bottom margin before each element.
const QUESTION_RESERVE: f32 = 100.0;
const LINE_RESERVE: f32 = 20.0;
const IMAGE_RESERVE: f32 = 150.0;
const SEPARATOR_RESERVE: f32 = 30.0;

const IMAGE_GAP: f32 = 20.0;
const PLACEHOLDER_OFFSET: f32 = 20.0;
const PLACEHOLDER_STEP: f32 = 30.0;
const SEPARATOR_OFFSET: f32 = 20.0;
const SEPARATOR_STEP: f32 = 40.0;
const SEPARATOR_GRAY: f32 = 0.8;
const SEPARATOR_WIDTH: f32 = 0.5;

/// Encodes questions as an A4 PDF document.
#[derive(Debug, Clone, Default)]
pub struct PdfEncoder;

impl PdfEncoder {
    /// Create a new PDF encoder.
    pub fn new() -> Self {
        Self
    }
}

/// Helvetica advance widths for WinAnsi 0x20..=0x7E, in 1/1000 em.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

fn char_width(ch: char) -> f32 {
    let units = match ch {
        ' '..='~' => HELVETICA_ASCII[ch as usize - 0x20],
        'ä' | 'ö' | 'ü' | 'á' | 'à' | 'é' | 'è' | 'ó' | 'ò' | 'ú' | 'ù' | 'ñ' => 556,
        'Ä' => 667,
        'Ö' => 778,
        'Ü' => 722,
        'ß' => 611,
        _ => 556,
    };
    units as f32 * FONT_SIZE / 1000.0
}

fn text_width(text: &str) -> f32 {
    text.chars().map(char_width).sum()
}

/// Break a line into pieces no wider than `max_width`.
///
/// Breaks at spaces where possible; a single word wider than the line is
/// split between characters.
fn wrap_line(line: &str, max_width: f32) -> Vec<String> {
    if text_width(line) <= max_width {
        return vec![line.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split(' ') {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if text_width(&candidate) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        for ch in word.chars() {
            if !current.is_empty() && text_width(&current) + char_width(ch) > max_width {
                lines.push(std::mem::take(&mut current));
            }
            current.push(ch);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Map text to WinAnsi bytes; unmappable characters become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => ch as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn image_stream(width: u32, height: u32, color_space: &str, samples: &[u8]) -> Result<Stream> {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8_i64,
        "Filter" => "FlateDecode",
    };
    let mut stream = Stream::new(dict, deflate(samples)?);
    stream.allows_compression = false;
    Ok(stream)
}

/// Page-by-page drawing surface over a lopdf document.
struct PdfCanvas {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    margins: Margins,
    page_ids: Vec<ObjectId>,
    operations: Vec<Operation>,
    xobjects: Dictionary,
    images: usize,
    y: f32,
}

impl PdfCanvas {
    fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let margins = Margins::question_sheet();

        Self {
            doc,
            pages_id,
            font_id,
            margins,
            page_ids: Vec::new(),
            operations: Vec::new(),
            xobjects: Dictionary::new(),
            images: 0,
            y: A4_HEIGHT_PT - margins.top,
        }
    }

    fn available_width(&self) -> f32 {
        A4_WIDTH_PT - self.margins.left - self.margins.right
    }

    fn available_height(&self) -> f32 {
        A4_HEIGHT_PT - self.margins.top - self.margins.bottom
    }

    /// Start a new page if less than `reserve` remains above the bottom margin.
    fn ensure_space(&mut self, reserve: f32) -> Result<()> {
        if self.y < self.margins.bottom + reserve {
            self.new_page()?;
        }
        Ok(())
    }

    fn new_page(&mut self) -> Result<()> {
        self.flush_page()?;
        self.y = A4_HEIGHT_PT - self.margins.top;
        Ok(())
    }

    fn flush_page(&mut self) -> Result<()> {
        let content = Content {
            operations: std::mem::take(&mut self.operations),
        };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode()?));

        let resources = dictionary! {
            "Font" => dictionary! { FONT_NAME => self.font_id },
            "XObject" => std::mem::take(&mut self.xobjects),
        };
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.page_ids.push(page_id);
        log::trace!("Flushed PDF page {}", self.page_ids.len());
        Ok(())
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str) {
        self.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![FONT_NAME.into(), FONT_SIZE.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    /// Draw one text line below the cursor, wrapping to the printable width.
    fn text_line(&mut self, line: &str) -> Result<()> {
        let line = line.replace('\t', "    ");
        for piece in wrap_line(&line, self.available_width()) {
            self.ensure_space(LINE_RESERVE)?;
            let (x, y) = (self.margins.left, self.y - LINE_STEP);
            self.draw_text(x, y, &piece);
            self.y -= LINE_STEP;
        }
        Ok(())
    }

    fn blank_line(&mut self) {
        self.y -= BLANK_LINE_STEP;
    }

    fn placeholder(&mut self, text: &str) {
        let (x, y) = (self.margins.left, self.y - PLACEHOLDER_OFFSET);
        self.draw_text(x, y, text);
        self.y -= PLACEHOLDER_STEP;
    }

    fn separator(&mut self) -> Result<()> {
        self.ensure_space(SEPARATOR_RESERVE)?;
        let y = self.y - SEPARATOR_OFFSET;
        let (x0, x1) = (self.margins.left, self.margins.left + self.available_width());
        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("G", vec![SEPARATOR_GRAY.into()]),
            Operation::new("w", vec![SEPARATOR_WIDTH.into()]),
            Operation::new("m", vec![x0.into(), y.into()]),
            Operation::new("l", vec![x1.into(), y.into()]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
        self.y -= SEPARATOR_STEP;
        Ok(())
    }

    /// Embed an image and draw it below the cursor.
    ///
    /// The image is fitted into the printable width and half the printable
    /// height; it never grows.
    fn image(&mut self, image: &DynamicImage) -> Result<()> {
        let (width, height) = image.dimensions();
        let scale = (self.available_width() / width as f32)
            .min(self.available_height() * 0.5 / height as f32)
            .min(1.0);
        let (display_w, display_h) = (width as f32 * scale, height as f32 * scale);

        let mut stream = image_stream(width, height, "DeviceRGB", image.to_rgb8().as_raw())?;
        if image.color().has_alpha() {
            let alpha: Vec<u8> = image.to_rgba8().pixels().map(|p| p.0[3]).collect();
            let mask_id = self
                .doc
                .add_object(image_stream(width, height, "DeviceGray", &alpha)?);
            stream.dict.set("SMask", mask_id);
        }
        let image_id = self.doc.add_object(stream);

        if self.y - display_h < self.margins.bottom {
            self.new_page()?;
        }

        self.images += 1;
        let name = format!("Im{}", self.images);
        self.xobjects.set(name.as_bytes().to_vec(), image_id);

        let (x, y) = (self.margins.left, self.y - display_h);
        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    display_w.into(),
                    0_i64.into(),
                    0_i64.into(),
                    display_h.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        self.y -= display_h + IMAGE_GAP;
        Ok(())
    }

    fn finish(mut self) -> Result<(Vec<u8>, usize)> {
        self.flush_page()?;

        let kids: Vec<Object> = self.page_ids.iter().map(|id| (*id).into()).collect();
        let page_count = kids.len();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "MediaBox" => vec![0_i64.into(), 0_i64.into(), A4_WIDTH_PT.into(), A4_HEIGHT_PT.into()],
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let created = chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();
        let info_id = self.doc.add_object(dictionary! {
            "Title" => Object::string_literal("Questions"),
            "Producer" => Object::string_literal(format!("qbank {}", env!("CARGO_PKG_VERSION"))),
            "CreationDate" => Object::string_literal(created),
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);

        self.doc.compress();
        let mut out = Vec::new();
        self.doc.save_to(&mut out)?;
        Ok((out, page_count))
    }
}

/// Decode a prepared image for embedding.
fn decode_prepared(processor: &ImageProcessor, prepared: Result<PreparedImage>) -> Result<(PreparedImage, DynamicImage)> {
    let prepared = prepared?;
    let decoded = processor.decode(&prepared.asset)?;
    Ok((prepared, decoded))
}

impl Encoder for PdfEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
    }

    fn encode(&self, questions: &[Question], ctx: &mut EncodeContext<'_>) -> Result<Vec<u8>> {
        let mut canvas = PdfCanvas::new();
        let max_height = max_image_height_px(PDF_DPI);

        for (index, question) in questions.iter().enumerate() {
            ctx.check_cancelled()?;
            canvas.ensure_space(QUESTION_RESERVE)?;

            let text = ctx.numbered_text(index, question);
            let include_images = ctx.options().include_images;
            let mut prepared = if include_images {
                ctx.prepare_images(question, u32::MAX, max_height, TargetEncoding::Original)
            } else {
                ctx.summary.add_omitted(question.image_count());
                Vec::new()
            }
            .into_iter();

            let segments: Vec<&str> = text.split(IMAGE_MARKER).collect();
            let image_slots = segments.len() - 1;
            for (i, segment) in segments.into_iter().enumerate() {
                if !segment.trim().is_empty() {
                    for line in segment.split('\n') {
                        if line.trim().is_empty() {
                            canvas.blank_line();
                        } else {
                            canvas.text_line(line.trim_end())?;
                        }
                    }
                }

                if i >= image_slots || !include_images {
                    continue;
                }
                let Some(result) = prepared.next() else {
                    continue;
                };

                canvas.ensure_space(IMAGE_RESERVE)?;
                match decode_prepared(ctx.processor(), result) {
                    Ok((image, decoded)) => {
                        canvas.image(&decoded)?;
                        ctx.summary.add_image(&image);
                    }
                    Err(e) => {
                        log::warn!("Image {} could not be drawn: {}", i + 1, e);
                        ctx.summary.add_replaced();
                        canvas.placeholder(&format!("[Image {}]", i + 1));
                    }
                }
            }

            if index + 1 < questions.len() {
                canvas.separator()?;
            }

            ctx.question_done();
        }

        let (bytes, pages) = canvas.finish()?;
        for _ in 0..pages {
            ctx.summary.add_page();
        }
        Ok(bytes)
    }
}
