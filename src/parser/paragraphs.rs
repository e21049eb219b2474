//! Paragraph stream extraction from WordprocessingML.

use crate::error::{Error, Result};
use crate::model::Paragraph;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Read the body-level paragraphs of a main document part, in order.
///
/// Paragraphs inside tables and text boxes are not part of the stream.
/// Alternate-content fallbacks are skipped so each image is seen once.
pub fn read_paragraphs(xml: &[u8]) -> Result<Vec<Paragraph>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut walker = BodyWalker::default();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => walker.open(e)?,
            Event::Empty(ref e) => {
                walker.open(e)?;
                walker.close(e.local_name().as_ref());
            }
            Event::End(ref e) => walker.close(e.local_name().as_ref()),
            Event::Text(ref t) => {
                if walker.collecting_text() {
                    let text = t.unescape()?;
                    walker.push_text(&text);
                }
            }
            Event::CData(ref t) => {
                if walker.collecting_text() {
                    walker.push_text(&String::from_utf8_lossy(t));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    log::debug!("Read {} body paragraphs", walker.paragraphs.len());
    Ok(walker.paragraphs)
}

#[derive(Default)]
struct BodyWalker {
    paragraphs: Vec<Paragraph>,
    current: Option<Paragraph>,
    depth: usize,
    paragraph_depth: usize,
    in_body: bool,
    table_depth: usize,
    textbox_depth: usize,
    fallback_depth: usize,
    run_depth: usize,
    drawing_depth: usize,
    in_text: bool,
}

impl BodyWalker {
    fn skipping(&self) -> bool {
        self.table_depth > 0 || self.textbox_depth > 0 || self.fallback_depth > 0
    }

    fn collecting_text(&self) -> bool {
        self.in_text && self.current.is_some() && !self.skipping() && self.drawing_depth == 0
    }

    fn push_text(&mut self, text: &str) {
        if let Some(p) = self.current.as_mut() {
            p.add_text(text);
        }
    }

    fn open(&mut self, e: &BytesStart<'_>) -> Result<()> {
        self.depth += 1;
        let name = e.local_name();

        match name.as_ref() {
            b"body" => self.in_body = true,
            b"tbl" => self.table_depth += 1,
            b"txbxContent" => self.textbox_depth += 1,
            b"Fallback" => self.fallback_depth += 1,
            b"drawing" | b"pict" | b"object" => self.drawing_depth += 1,
            b"p" if self.in_body && self.current.is_none() && !self.skipping() => {
                self.current = Some(Paragraph::new());
                self.paragraph_depth = self.depth;
            }
            b"r" if self.current.is_some() => self.run_depth += 1,
            b"t" if self.run_depth > 0 => self.in_text = true,
            b"tab" if self.run_depth > 0 && self.collecting_inline() => {
                if let Some(p) = self.current.as_mut() {
                    p.add_tab();
                }
            }
            b"br" | b"cr" if self.run_depth > 0 && self.collecting_inline() => {
                if let Some(p) = self.current.as_mut() {
                    p.add_line_break();
                }
            }
            b"blip" if self.current.is_some() && !self.skipping() => {
                if let Some(id) = relationship_attr(e, b"embed")? {
                    self.add_image(id);
                }
            }
            b"imagedata" if self.current.is_some() && !self.skipping() => {
                if let Some(id) = relationship_attr(e, b"id")? {
                    self.add_image(id);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"body" => self.in_body = false,
            b"tbl" => self.table_depth = self.table_depth.saturating_sub(1),
            b"txbxContent" => self.textbox_depth = self.textbox_depth.saturating_sub(1),
            b"Fallback" => self.fallback_depth = self.fallback_depth.saturating_sub(1),
            b"drawing" | b"pict" | b"object" => {
                self.drawing_depth = self.drawing_depth.saturating_sub(1)
            }
            b"p" if self.current.is_some() && self.depth == self.paragraph_depth => {
                if let Some(p) = self.current.take() {
                    self.paragraphs.push(p);
                }
                self.run_depth = 0;
                self.in_text = false;
            }
            b"r" if self.current.is_some() => self.run_depth = self.run_depth.saturating_sub(1),
            b"t" => self.in_text = false,
            _ => {}
        }
        self.depth = self.depth.saturating_sub(1);
    }

    fn collecting_inline(&self) -> bool {
        !self.skipping() && self.drawing_depth == 0
    }

    fn add_image(&mut self, rel_id: String) {
        if let Some(p) = self.current.as_mut() {
            p.add_image(rel_id);
        }
    }
}

/// Find a namespaced relationship attribute such as `r:embed` or `r:id`.
fn relationship_attr(e: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes().flatten() {
        if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == local {
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(e.to_string()))?;
            if !value.is_empty() {
                return Ok(Some(value.into_owned()));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InlineContent;

    fn document(body: &str) -> Vec<u8> {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:v="urn:schemas-microsoft-com:vml" xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006"><w:body>{}<w:sectPr/></w:body></w:document>"#,
            body
        )
        .into_bytes()
    }

    #[test]
    fn test_plain_paragraphs() {
        let xml = document(
            r#"<w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t xml:space="preserve"> world</w:t></w:r></w:p><w:p/><w:p><w:r><w:t>A &amp; B</w:t></w:r></w:p>"#,
        );
        let paragraphs = read_paragraphs(&xml).unwrap();
        assert_eq!(paragraphs.len(), 3);
        assert_eq!(paragraphs[0].plain_text(), "Hello world");
        assert!(paragraphs[1].is_blank());
        assert_eq!(paragraphs[2].plain_text(), "A & B");
    }

    #[test]
    fn test_tabs_and_breaks() {
        let xml = document(
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:tab/><w:t>x</w:t><w:br/><w:t>y</w:t></w:r></w:p>"#,
        );
        let paragraphs = read_paragraphs(&xml).unwrap();
        assert_eq!(paragraphs[0].plain_text(), "\tx\ny");
    }

    #[test]
    fn test_drawing_and_vml_images() {
        let xml = document(
            r#"<w:p><w:r><w:t>See</w:t></w:r><w:r><w:drawing><wp:inline xmlns:wp="wp"><a:graphic><a:graphicData><pic:pic xmlns:pic="pic"><pic:blipFill><a:blip r:embed="rId4"/></pic:blipFill></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r><w:r><w:pict><v:shape><v:imagedata r:id="rId9" o:title="" xmlns:o="o"/></v:shape></w:pict></w:r></w:p>"#,
        );
        let paragraphs = read_paragraphs(&xml).unwrap();
        assert_eq!(paragraphs[0].image_refs(), vec!["rId4", "rId9"]);
        assert_eq!(paragraphs[0].plain_text(), "See");
    }

    #[test]
    fn test_fallback_skipped() {
        let xml = document(
            r#"<w:p><w:r><mc:AlternateContent><mc:Choice Requires="wps"><w:drawing><a:blip r:embed="rId1"/></w:drawing></mc:Choice><mc:Fallback><w:pict><v:imagedata r:id="rId1"/></w:pict></mc:Fallback></mc:AlternateContent></w:r></w:p>"#,
        );
        let paragraphs = read_paragraphs(&xml).unwrap();
        assert_eq!(paragraphs[0].image_refs(), vec!["rId1"]);
    }

    #[test]
    fn test_tables_and_textboxes_excluded() {
        let xml = document(
            r#"<w:p><w:r><w:t>before</w:t></w:r></w:p><w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl><w:p><w:r><w:drawing><wps:txbx xmlns:wps="wps"><w:txbxContent><w:p><w:r><w:t>boxed</w:t></w:r></w:p></w:txbxContent></wps:txbx></w:drawing><w:t>after</w:t></w:r></w:p>"#,
        );
        let paragraphs = read_paragraphs(&xml).unwrap();
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].plain_text(), "before");
        assert_eq!(paragraphs[1].plain_text(), "after");
    }

    #[test]
    fn test_inline_order() {
        let xml = document(
            r#"<w:p><w:r><w:t>a</w:t></w:r><w:r><w:drawing><a:blip r:embed="rId2"/></w:drawing></w:r><w:r><w:t>b</w:t></w:r></w:p>"#,
        );
        let paragraphs = read_paragraphs(&xml).unwrap();
        assert_eq!(
            paragraphs[0].content,
            vec![
                InlineContent::Text("a".into()),
                InlineContent::Image {
                    rel_id: "rId2".into()
                },
                InlineContent::Text("b".into()),
            ]
        );
    }

    #[test]
    fn test_malformed_xml() {
        let result = read_paragraphs(b"<w:document><w:body><w:p></w:body>");
        assert!(matches!(result, Err(Error::Xml(_))));
    }
}
