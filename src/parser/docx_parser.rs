//! DOCX question document parser.

use std::io::{Cursor, Read};
use std::path::Path;

use crate::error::Result;
use crate::imaging::ImageProcessor;
use crate::model::{Paragraph, Question};

use super::options::ParseOptions;
use super::package::DocxPackage;
use super::paragraphs::read_paragraphs;
use super::question_parser::QuestionParser;
use super::report::ParseReport;

/// Questions extracted from one document, with diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    /// Questions in document order
    pub questions: Vec<Question>,
    /// Anomalies and counters gathered while parsing
    pub report: ParseReport,
}

impl ParsedDocument {
    /// Number of questions.
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Total number of images across all questions.
    pub fn image_count(&self) -> usize {
        self.questions.iter().map(Question::image_count).sum()
    }

    /// Check if no questions were found.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// DOCX question document parser.
pub struct DocxParser {
    package: DocxPackage,
    paragraphs: Vec<Paragraph>,
    parser: QuestionParser,
}

impl DocxParser {
    /// Open a DOCX file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ParseOptions::default())
    }

    /// Open a DOCX file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Opening {}", path.display());
        let data = std::fs::read(path)?;
        Self::from_bytes_with_options(&data, options)
    }

    /// Parse a DOCX document from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    /// Parse a DOCX document from bytes with custom options.
    pub fn from_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<Self> {
        let package = DocxPackage::from_reader(Cursor::new(data))?;
        let paragraphs = read_paragraphs(package.document_xml())?;
        Ok(Self {
            package,
            paragraphs,
            parser: QuestionParser::new(options),
        })
    }

    /// Parse a DOCX document from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_reader_with_options(reader, ParseOptions::default())
    }

    /// Parse a DOCX document from a reader with custom options.
    pub fn from_reader_with_options<R: Read>(mut reader: R, options: ParseOptions) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes_with_options(&data, options)
    }

    /// Use a specific image processor, e.g. one backed by a shared cache.
    pub fn with_processor(mut self, processor: ImageProcessor) -> Self {
        self.parser = self.parser.with_processor(processor);
        self
    }

    /// The paragraph stream of the main document part.
    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    /// The underlying package.
    pub fn package(&self) -> &DocxPackage {
        &self.package
    }

    /// Extract the questions.
    pub fn parse(&self) -> ParsedDocument {
        let (questions, report) = self
            .parser
            .parse_with_report(&self.paragraphs, &self.package);
        ParsedDocument { questions, report }
    }
}
