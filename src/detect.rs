//! DOCX format detection and validation.

use crate::error::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

/// Word processing package information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocxFormat {
    /// Part name of the main document (e.g., "/word/document.xml")
    pub main_part: String,
    /// Whether the package is a macro-enabled document (.docm)
    pub macro_enabled: bool,
    /// Whether the package is a template (.dotx/.dotm)
    pub template: bool,
}

impl std::fmt::Display for DocxFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match (self.template, self.macro_enabled) {
            (false, false) => "DOCX",
            (false, true) => "DOCM",
            (true, false) => "DOTX",
            (true, true) => "DOTM",
        };
        write!(f, "{} ({})", kind, self.main_part)
    }
}

/// Zip local file header signature.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// Main document content types, paired with (macro_enabled, template).
const MAIN_CONTENT_TYPES: &[(&str, bool, bool)] = &[
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
        false,
        false,
    ),
    (
        "application/vnd.ms-word.document.macroEnabled.main+xml",
        true,
        false,
    ),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.template.main+xml",
        false,
        true,
    ),
    (
        "application/vnd.ms-word.template.macroEnabledTemplate.main+xml",
        true,
        true,
    ),
];

/// Detect a DOCX package from a file path.
///
/// # Example
/// ```no_run
/// use qbank::detect::detect_format_from_path;
///
/// let format = detect_format_from_path("questions.docx").unwrap();
/// println!("Main part: {}", format.main_part);
/// ```
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<DocxFormat> {
    let mut data = Vec::new();
    File::open(path)?.read_to_end(&mut data)?;
    detect_format_from_bytes(&data)
}

/// Detect a DOCX package from its bytes.
///
/// # Returns
/// * `Ok(DocxFormat)` if the data is a zip package declaring a Word main part
/// * `Err(Error::UnknownFormat)` otherwise
pub fn detect_format_from_bytes(data: &[u8]) -> Result<DocxFormat> {
    if !has_zip_magic(data) {
        return Err(Error::UnknownFormat);
    }

    let mut archive =
        zip::ZipArchive::new(Cursor::new(data)).map_err(|_| Error::UnknownFormat)?;
    let mut entry = archive
        .by_name(CONTENT_TYPES_PART)
        .map_err(|_| Error::UnknownFormat)?;
    let mut xml = Vec::new();
    entry.read_to_end(&mut xml)?;

    find_main_part(&xml)?.ok_or(Error::UnknownFormat)
}

/// Check whether data starts with a zip local file header.
pub fn has_zip_magic(data: &[u8]) -> bool {
    data.starts_with(ZIP_MAGIC)
}

/// Scan `[Content_Types].xml` for the Word main document override.
fn find_main_part(xml: &[u8]) -> Result<Option<DocxFormat>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(ref e) | Event::Start(ref e) if e.local_name().as_ref() == b"Override" => {
                let mut part_name = None;
                let mut content_type = None;
                for attr in e.attributes().flatten() {
                    let value = attr
                        .unescape_value()
                        .map_err(|e| Error::Xml(e.to_string()))?
                        .into_owned();
                    match attr.key.local_name().as_ref() {
                        b"PartName" => part_name = Some(value),
                        b"ContentType" => content_type = Some(value),
                        _ => {}
                    }
                }

                if let (Some(part_name), Some(content_type)) = (part_name, content_type) {
                    let known = MAIN_CONTENT_TYPES
                        .iter()
                        .find(|(ct, _, _)| ct.eq_ignore_ascii_case(&content_type));
                    if let Some((_, macro_enabled, template)) = known {
                        return Ok(Some(DocxFormat {
                            main_part: part_name,
                            macro_enabled: *macro_enabled,
                            template: *template,
                        }));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(None)
}

/// Check if a file is a DOCX package.
pub fn is_docx<P: AsRef<Path>>(path: P) -> bool {
    detect_format_from_path(path).is_ok()
}

/// Check if bytes represent a DOCX package.
pub fn is_docx_bytes(data: &[u8]) -> bool {
    detect_format_from_bytes(data).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn package_with_content_types(content_types: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(CONTENT_TYPES_PART, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content_types.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_detect_docx() {
        let data = package_with_content_types(
            r#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#,
        );
        let format = detect_format_from_bytes(&data).unwrap();
        assert_eq!(format.main_part, "/word/document.xml");
        assert!(!format.macro_enabled);
        assert_eq!(format.to_string(), "DOCX (/word/document.xml)");
    }

    #[test]
    fn test_detect_docm() {
        let data = package_with_content_types(
            r#"<Types><Override PartName="/word/document.xml" ContentType="application/vnd.ms-word.document.macroEnabled.main+xml"/></Types>"#,
        );
        let format = detect_format_from_bytes(&data).unwrap();
        assert!(format.macro_enabled);
        assert!(!format.template);
    }

    #[test]
    fn test_detect_zip_without_word_part() {
        let data = package_with_content_types(
            r#"<Types><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#,
        );
        assert!(matches!(
            detect_format_from_bytes(&data),
            Err(Error::UnknownFormat)
        ));
    }

    #[test]
    fn test_detect_invalid_format() {
        let result = detect_format_from_bytes(b"%PDF-1.7\n");
        assert!(matches!(result, Err(Error::UnknownFormat)));
        assert!(!is_docx_bytes(b""));
    }

    #[test]
    fn test_zip_magic() {
        assert!(has_zip_magic(b"PK\x03\x04rest"));
        assert!(!has_zip_magic(b"PK"));
    }
}
