//! In-memory DOCX fixtures for integration tests.

#![allow(dead_code)]

use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Default Extension="jpeg" ContentType="image/jpeg"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Builds a Word package paragraph by paragraph.
#[derive(Default)]
pub struct DocxFixture {
    body: String,
    rels: String,
    media: Vec<(String, Vec<u8>)>,
}

impl DocxFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A paragraph with one run of text.
    pub fn paragraph(mut self, text: &str) -> Self {
        let _ = write!(
            self.body,
            r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            escape(text)
        );
        self
    }

    /// A start delimiter, the given paragraphs and an end delimiter.
    pub fn block(mut self, lines: &[&str]) -> Self {
        self = self.paragraph("---START---");
        for line in lines {
            self = self.paragraph(line);
        }
        self.paragraph("---END---")
    }

    /// A paragraph holding one inline picture.
    pub fn image(mut self, data: Vec<u8>, extension: &str) -> Self {
        let rel_id = self.add_media(data, extension);
        let _ = write!(
            self.body,
            r#"<w:p><w:r><w:drawing><wp:inline><wp:docPr id="1" name="Picture"/><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture"><pic:pic><pic:blipFill><a:blip r:embed="{}"/></pic:blipFill></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#,
            rel_id
        );
        self
    }

    /// A paragraph whose picture relationship points nowhere.
    pub fn dangling_image(mut self) -> Self {
        self.body.push_str(r#"<w:p><w:r><w:drawing><wp:inline><a:graphic><a:graphicData><pic:pic><pic:blipFill><a:blip r:embed="rId999"/></pic:blipFill></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#);
        self
    }

    /// A one-cell table; its text is not part of the paragraph stream.
    pub fn table(mut self, text: &str) -> Self {
        let _ = write!(
            self.body,
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
            escape(text)
        );
        self
    }

    fn add_media(&mut self, data: Vec<u8>, extension: &str) -> String {
        let n = self.media.len() + 1;
        let rel_id = format!("rId{}", n + 10);
        let name = format!("image{}.{}", n, extension);
        let _ = write!(
            self.rels,
            r#"<Relationship Id="{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/{}"/>"#,
            rel_id, name
        );
        self.media.push((name, data));
        rel_id
    }

    pub fn build(self) -> Vec<u8> {
        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture"><w:body>{}<w:sectPr/></w:body></w:document>"#,
            self.body
        );
        let document_rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
            self.rels
        );

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        let parts = [
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes().to_vec()),
            ("_rels/.rels", ROOT_RELS.as_bytes().to_vec()),
            ("word/document.xml", document.into_bytes()),
            ("word/_rels/document.xml.rels", document_rels.into_bytes()),
        ];
        for (name, data) in parts {
            zip.start_file(name, options).unwrap();
            zip.write_all(&data).unwrap();
        }
        for (name, data) in self.media {
            zip.start_file(format!("word/media/{}", name), options).unwrap();
            zip.write_all(&data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn encode(image: DynamicImage, format: image::ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

/// Solid RGB PNG.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([30, 90, 160]))),
        image::ImageFormat::Png,
    )
}

/// Half-transparent RGBA PNG.
pub fn translucent_png(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 100]))),
        image::ImageFormat::Png,
    )
}

/// Solid JPEG.
pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([120, 120, 120]))),
        image::ImageFormat::Jpeg,
    )
}

/// Two questions, the second with one picture.
pub fn aufgabe_document() -> Vec<u8> {
    DocxFixture::new()
        .paragraph("Fragenkatalog")
        .block(&["Aufgabe 7", "Was ist 2 + 2?"])
        .paragraph("---START---")
        .paragraph("Aufgabe 12")
        .paragraph("Beschreibe das Bild:")
        .image(png(100, 600), "png")
        .paragraph("---END---")
        .build()
}
