//! # qbank
//!
//! Question bank extraction and export for Word documents.
//!
//! Questions are stored in a DOCX file as delimited blocks: a paragraph
//! reading `---START---`, the question text with its inline pictures, and a
//! paragraph reading `---END---`. This library extracts those blocks into
//! [`Question`] records, where every picture is represented by a `[BILD]`
//! marker at its anchor position, and exports any selection of them to
//! DOCX, PDF, plain text, HTML or JSON.
//!
//! ## Quick Start
//!
//! ```no_run
//! use qbank::{export, parse_file, ExportFormat, ExportOptions};
//!
//! fn main() -> qbank::Result<()> {
//!     let doc = parse_file("fragen.docx")?;
//!     println!("{} questions, {} images", doc.question_count(), doc.image_count());
//!
//!     let options = ExportOptions::new(ExportFormat::Pdf).sequential();
//!     let summary = export(&doc.questions, &options, "fragen.pdf")?;
//!     println!("{} pages written", summary.pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Streaming paragraph reader** over `word/document.xml` with inline
//!   picture anchors resolved through the package relationships
//! - **Fault-tolerant block parsing**: stray or nested delimiters and
//!   unreadable images are reported, never fatal
//! - **Five output formats** with images bounded to a quarter page height
//! - **Sequential renumbering** of `Aufgabe N` headings on export
//! - **Background export** with progress events and cancellation
//! - **Parallel processing**: Uses Rayon for image decoding and scaling

pub mod detect;
pub mod error;
pub mod export;
pub mod imaging;
pub mod model;
pub mod parser;
pub mod renumber;
pub mod selection;

// Re-export commonly used types
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_docx, DocxFormat};
pub use error::{Error, Result};
pub use export::{
    Encoder, ExportEngine, ExportEvent, ExportFormat, ExportHandle, ExportOptions, ExportSession,
    ExportSummary, ExportWorker, JsonFormat, NoProgress, ProgressSink,
};
pub use imaging::{ImageCache, ImageProcessor};
pub use model::{ImageAsset, ImageFormat, InlineContent, Paragraph, Question, IMAGE_MARKER};
pub use parser::{Anomaly, DocxParser, ParseOptions, ParseReport, ParsedDocument};
pub use renumber::{renumber, NumberingMode};
pub use selection::Selection;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// Parse a DOCX file and return its questions.
///
/// # Example
///
/// ```no_run
/// use qbank::parse_file;
///
/// let doc = parse_file("fragen.docx").unwrap();
/// println!("Questions: {}", doc.question_count());
/// ```
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<ParsedDocument> {
    let parser = DocxParser::open(path)?;
    Ok(parser.parse())
}

/// Parse a DOCX file with custom options.
///
/// # Example
///
/// ```no_run
/// use qbank::{parse_file_with_options, ParseOptions};
///
/// let options = ParseOptions::new()
///     .with_delimiters("<<<", ">>>")
///     .text_only();
/// let doc = parse_file_with_options("fragen.docx", options).unwrap();
/// ```
pub fn parse_file_with_options<P: AsRef<Path>>(
    path: P,
    options: ParseOptions,
) -> Result<ParsedDocument> {
    let parser = DocxParser::open_with_options(path, options)?;
    Ok(parser.parse())
}

/// Parse a DOCX document from bytes.
pub fn parse_bytes(data: &[u8]) -> Result<ParsedDocument> {
    let parser = DocxParser::from_bytes(data)?;
    Ok(parser.parse())
}

/// Parse a DOCX document from bytes with custom options.
pub fn parse_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<ParsedDocument> {
    let parser = DocxParser::from_bytes_with_options(data, options)?;
    Ok(parser.parse())
}

/// Parse a DOCX document from a reader.
///
/// # Example
///
/// ```no_run
/// use qbank::parse_reader;
/// use std::fs::File;
///
/// let file = File::open("fragen.docx").unwrap();
/// let doc = parse_reader(file).unwrap();
/// ```
pub fn parse_reader<R: Read>(reader: R) -> Result<ParsedDocument> {
    let parser = DocxParser::from_reader(reader)?;
    Ok(parser.parse())
}

/// Parse a DOCX document from a reader with custom options.
pub fn parse_reader_with_options<R: Read>(
    reader: R,
    options: ParseOptions,
) -> Result<ParsedDocument> {
    let parser = DocxParser::from_reader_with_options(reader, options)?;
    Ok(parser.parse())
}

/// Export questions to a file with the default encoders.
///
/// # Example
///
/// ```no_run
/// use qbank::{export, parse_file, ExportFormat, ExportOptions};
///
/// let doc = parse_file("fragen.docx").unwrap();
/// let options = ExportOptions::new(ExportFormat::Html).with_images(false);
/// export(&doc.questions, &options, "fragen.html").unwrap();
/// ```
pub fn export<P: AsRef<Path>>(
    questions: &[Question],
    options: &ExportOptions,
    destination: P,
) -> Result<ExportSummary> {
    let engine = ExportEngine::with_defaults();
    engine.export(questions, options, destination.as_ref(), &mut NoProgress)
}

/// Builder for parsing a question document and exporting a selection.
///
/// # Example
///
/// ```no_run
/// use qbank::{ExportFormat, Qbank, Selection};
///
/// let result = Qbank::new()
///     .sequential_numbering()
///     .with_cache()
///     .parse("fragen.docx")?;
/// let picked = result.select(&[Selection::parse("1-3")?])?;
/// result.export(&picked, ExportFormat::Docx, "auswahl.docx")?;
/// # Ok::<(), qbank::Error>(())
/// ```
pub struct Qbank {
    parse_options: ParseOptions,
    export_options: ExportOptions,
    processor: ImageProcessor,
}

impl Qbank {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            parse_options: ParseOptions::default(),
            export_options: ExportOptions::default(),
            processor: ImageProcessor::new(),
        }
    }

    /// Use custom block delimiters.
    pub fn with_delimiters(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.parse_options = self.parse_options.with_delimiters(start, end);
        self
    }

    /// Skip image extraction while parsing.
    pub fn text_only(mut self) -> Self {
        self.parse_options = self.parse_options.text_only();
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parse_options = self.parse_options.sequential();
        self.export_options = self.export_options.with_parallel(false);
        self
    }

    /// Renumber questions by output position on export.
    pub fn sequential_numbering(mut self) -> Self {
        self.export_options = self.export_options.sequential();
        self
    }

    /// Set the label used for renumbering.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.export_options = self.export_options.with_label(label);
        self
    }

    /// Include or omit images on export.
    pub fn with_images(mut self, include: bool) -> Self {
        self.export_options = self.export_options.with_images(include);
        self
    }

    /// Share decoded and scaled images between parsing and all exports.
    pub fn with_cache(mut self) -> Self {
        self.processor = ImageProcessor::with_cache(Arc::new(ImageCache::new()));
        self
    }

    /// Parse a DOCX file and return a result wrapper.
    pub fn parse<P: AsRef<Path>>(self, path: P) -> Result<QbankResult> {
        let parser = DocxParser::open_with_options(path, self.parse_options.clone())?
            .with_processor(self.processor.clone());
        Ok(self.finish(parser))
    }

    /// Parse a DOCX document from bytes.
    pub fn parse_bytes(self, data: &[u8]) -> Result<QbankResult> {
        let parser = DocxParser::from_bytes_with_options(data, self.parse_options.clone())?
            .with_processor(self.processor.clone());
        Ok(self.finish(parser))
    }

    fn finish(self, parser: DocxParser) -> QbankResult {
        QbankResult {
            document: parser.parse(),
            export_options: self.export_options,
            engine: ExportEngine::with_defaults().with_processor(self.processor),
        }
    }
}

impl Default for Qbank {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of parsing a question document.
pub struct QbankResult {
    /// The parsed document
    pub document: ParsedDocument,
    /// Export options to use
    export_options: ExportOptions,
    engine: ExportEngine,
}

impl QbankResult {
    /// All questions in document order.
    pub fn questions(&self) -> &[Question] {
        &self.document.questions
    }

    /// Parse diagnostics.
    pub fn report(&self) -> &ParseReport {
        &self.document.report
    }

    /// Questions matching every criterion, in document order.
    pub fn select(&self, criteria: &[Selection]) -> Result<Vec<Question>> {
        let indices = selection::select(&self.document.questions, criteria)?;
        Ok(selection::pick(&self.document.questions, &indices))
    }

    /// Encode questions into memory.
    pub fn encode(&self, questions: &[Question], format: ExportFormat) -> Result<Vec<u8>> {
        let options = self.export_options.clone().with_format(format);
        let (bytes, _) = self.engine.encode(questions, &options, &mut NoProgress)?;
        Ok(bytes)
    }

    /// Export questions to a file.
    pub fn export<P: AsRef<Path>>(
        &self,
        questions: &[Question],
        format: ExportFormat,
        destination: P,
    ) -> Result<ExportSummary> {
        let options = self.export_options.clone().with_format(format);
        self.engine
            .export(questions, &options, destination.as_ref(), &mut NoProgress)
    }

    /// Export every question to a file.
    pub fn export_all<P: AsRef<Path>>(
        &self,
        format: ExportFormat,
        destination: P,
    ) -> Result<ExportSummary> {
        self.export(&self.document.questions, format, destination)
    }
}
