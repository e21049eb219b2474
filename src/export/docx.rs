//! DOCX encoder.
//!
//! Writes a minimal WordprocessingML package: A4 pages with a 3 cm left
//! margin, Times New Roman 11 pt, one paragraph per text line and inline
//! pictures at their marker positions.

use super::layout::{max_image_height_px, px_to_emu, SCREEN_DPI};
use super::{EncodeContext, Encoder, ExportFormat};
use crate::error::Result;
use crate::imaging::{PreparedImage, TargetEncoding};
use crate::model::{Question, IMAGE_MARKER};
use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

const SEPARATOR: &str = "~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~";

/// Left indent for lines starting with four spaces or a tab (20 pt).
const INDENT_TWIPS: u32 = 400;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_TYPE_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Default Extension="jpeg" ContentType="image/jpeg"/><Default Extension="gif" ContentType="image/gif"/><Default Extension="bmp" ContentType="image/bmp"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Times New Roman" w:hAnsi="Times New Roman" w:eastAsia="Times New Roman" w:cs="Times New Roman"/><w:sz w:val="22"/><w:szCs w:val="22"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="0" w:line="240" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/><w:rPr><w:rFonts w:ascii="Times New Roman" w:hAnsi="Times New Roman"/><w:sz w:val="22"/></w:rPr></w:style></w:styles>"#;

/// A4 page, margins top/right/bottom 1 cm and left 3 cm (in twips).
const SECT_PR: &str = r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="567" w:right="567" w:bottom="567" w:left="1701" w:header="709" w:footer="709" w:gutter="0"/></w:sectPr>"#;

/// Encodes questions as a Word document.
#[derive(Debug, Clone, Default)]
pub struct DocxEncoder;

impl DocxEncoder {
    /// Create a new DOCX encoder.
    pub fn new() -> Self {
        Self
    }
}

/// Accumulates document body and media parts.
#[derive(Default)]
struct DocumentBuilder {
    body: String,
    media: Vec<(String, Vec<u8>)>,
    rels: String,
    next_drawing_id: u32,
}

impl DocumentBuilder {
    fn text_paragraph(&mut self, line: &str) {
        let indented = line.starts_with("    ") || line.starts_with('\t');
        self.body.push_str("<w:p>");
        if indented {
            self.body.push_str(&format!("<w:pPr><w:ind w:left=\"{}\"/></w:pPr>", INDENT_TWIPS));
        }
        if !line.is_empty() {
            self.body.push_str("<w:r>");
            for (i, piece) in line.split('\t').enumerate() {
                if i > 0 {
                    self.body.push_str("<w:tab/>");
                }
                if !piece.is_empty() {
                    self.body.push_str(&format!("<w:t xml:space=\"preserve\">{}</w:t>", escape(piece)));
                }
            }
            self.body.push_str("</w:r>");
        }
        self.body.push_str("</w:p>");
    }

    fn centered_paragraph(&mut self, text: &str) {
        self.body.push_str(&format!(
            "<w:p><w:pPr><w:jc w:val=\"center\"/></w:pPr><w:r><w:t>{}</w:t></w:r></w:p>",
            escape(text)
        ));
    }

    fn image_paragraph(&mut self, image: &PreparedImage) {
        self.next_drawing_id += 1;
        let id = self.next_drawing_id;
        // rId1 is reserved for styles
        let rel_id = format!("rId{}", id + 1);
        let name = format!("image{}.{}", id, image.asset.format.extension());

        self.rels.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}/image" Target="media/{}"/>"#,
            rel_id, REL_TYPE_BASE, name
        ));

        let cx = px_to_emu(image.asset.width);
        let cy = px_to_emu(image.asset.height);
        self.body.push_str(&format!(
            r#"<w:p><w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0"><wp:extent cx="{cx}" cy="{cy}"/><wp:effectExtent l="0" t="0" r="0" b="0"/><wp:docPr id="{id}" name="Picture {id}"/><wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" noChangeAspect="1"/></wp:cNvGraphicFramePr><a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture"><pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture"><pic:nvPicPr><pic:cNvPr id="{id}" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#
        ));

        self.media.push((name, image.asset.data.clone()));
    }

    fn document_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{}" xmlns:r="{}" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"><w:body>{}{}</w:body></w:document>"#,
            W_NS, R_NS, self.body, SECT_PR
        )
    }

    fn document_rels_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{}"><Relationship Id="rId1" Type="{}/styles" Target="styles.xml"/>{}</Relationships>"#,
            REL_NS, REL_TYPE_BASE, self.rels
        )
    }

    fn finish(self, question_count: usize) -> Result<Vec<u8>> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        let parts: [(&str, String); 6] = [
            ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
            ("_rels/.rels", ROOT_RELS_XML.to_string()),
            ("word/document.xml", self.document_xml()),
            ("word/_rels/document.xml.rels", self.document_rels_xml()),
            ("word/styles.xml", STYLES_XML.to_string()),
            ("docProps/core.xml", core_properties_xml()),
        ];
        for (name, xml) in parts {
            zip.start_file(name, deflated)?;
            zip.write_all(xml.as_bytes())?;
        }

        zip.start_file("docProps/app.xml", deflated)?;
        zip.write_all(app_properties_xml(question_count).as_bytes())?;

        for (name, data) in &self.media {
            zip.start_file(format!("word/media/{}", name), stored)?;
            zip.write_all(data)?;
        }

        Ok(zip.finish()?.into_inner())
    }
}

fn core_properties_xml() -> String {
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>Questions</dc:title><dc:creator>qbank</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">{now}</dcterms:created><dcterms:modified xsi:type="dcterms:W3CDTF">{now}</dcterms:modified></cp:coreProperties>"#
    )
}

fn app_properties_xml(question_count: usize) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>qbank {}</Application><Paragraphs>{}</Paragraphs></Properties>"#,
        env!("CARGO_PKG_VERSION"),
        question_count
    )
}

impl Encoder for DocxEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Docx
    }

    fn encode(&self, questions: &[Question], ctx: &mut EncodeContext<'_>) -> Result<Vec<u8>> {
        let mut doc = DocumentBuilder::default();
        let max_height = max_image_height_px(SCREEN_DPI);

        for (index, question) in questions.iter().enumerate() {
            ctx.check_cancelled()?;

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
                        // empty lines survive only after the first image
                        if !line.is_empty() || i > 0 {
                            doc.text_paragraph(line.trim_end());
                        }
                    }
                }

                if i >= image_slots || !include_images {
                    continue;
                }
                match prepared.next() {
                    Some(Ok(image)) => {
                        ctx.summary.add_image(&image);
                        doc.image_paragraph(&image);
                    }
                    Some(Err(e)) => {
                        log::warn!("Image {} could not be placed: {}", i + 1, e);
                        ctx.summary.add_replaced();
                        doc.text_paragraph(&format!("[Image {}]", i + 1));
                    }
                    None => {}
                }
            }

            if index + 1 < questions.len() {
                doc.centered_paragraph(SEPARATOR);
            }

            ctx.question_done();
        }

        doc.finish(questions.len())
    }
}
