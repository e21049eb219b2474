//! Export module providing encoders for every output format.
//!
//! Each [`Encoder`] turns the same question list into one output format. The
//! [`ExportEngine`] picks the encoder named by [`ExportOptions::format`],
//! renders into memory and writes the destination in one step.
//!
//! # Example
//!
//! ```no_run
//! use qbank::export::{ExportEngine, ExportFormat, ExportOptions, NoProgress};
//! use std::path::Path;
//!
//! fn main() -> qbank::Result<()> {
//!     let doc = qbank::parse_file("fragen.docx")?;
//!     let engine = ExportEngine::with_defaults();
//!     let options = ExportOptions::new(ExportFormat::Pdf).sequential();
//!     let summary = engine.export(&doc.questions, &options, Path::new("fragen.pdf"), &mut NoProgress)?;
//!     println!("{} pages", summary.pages);
//!     Ok(())
//! }
//! ```

mod docx;
mod html;
mod json;
pub mod layout;
mod options;
mod pdf;
mod progress;
mod summary;
mod text;
mod worker;

pub use docx::DocxEncoder;
pub use html::HtmlEncoder;
pub use json::JsonEncoder;
pub use options::{ExportFormat, ExportOptions, JsonFormat};
pub use pdf::PdfEncoder;
pub use progress::{percent, NoProgress, ProgressSink};
pub use summary::ExportSummary;
pub use text::TextEncoder;
pub use worker::{ExportEvent, ExportHandle, ExportSession, ExportWorker};

pub use crate::renumber::NumberingMode;

use crate::error::{Error, Result};
use crate::imaging::{ImageProcessor, PreparedImage, TargetEncoding};
use crate::model::{ImageAsset, Question};
use crate::renumber::renumber;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// State shared between the engine and an encoder during one export.
pub struct EncodeContext<'a> {
    options: &'a ExportOptions,
    processor: &'a ImageProcessor,
    progress: &'a mut dyn ProgressSink,
    cancel: Option<&'a AtomicBool>,
    total: usize,
    processed: usize,
    /// Statistics accumulated by the encoder
    pub summary: ExportSummary,
}

impl<'a> EncodeContext<'a> {
    /// Create a context for encoding `total` questions.
    pub fn new(
        options: &'a ExportOptions,
        processor: &'a ImageProcessor,
        progress: &'a mut dyn ProgressSink,
        total: usize,
    ) -> Self {
        Self {
            options,
            processor,
            progress,
            cancel: None,
            total,
            processed: 0,
            summary: ExportSummary::new(),
        }
    }

    /// Observe a cancellation flag between questions.
    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// The export options.
    pub fn options(&self) -> &ExportOptions {
        self.options
    }

    /// The shared image processor.
    pub fn processor(&self) -> &ImageProcessor {
        self.processor
    }

    /// Question text with numbering applied for position `index`.
    pub fn numbered_text(&self, index: usize, question: &Question) -> String {
        renumber(
            question.text(),
            index,
            self.options.numbering,
            &self.options.label,
        )
    }

    /// Fail if the export was cancelled. Called before each question.
    pub fn check_cancelled(&self) -> Result<()> {
        match self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    /// Mark one question as written and report progress.
    pub fn question_done(&mut self) {
        self.processed += 1;
        self.summary.questions += 1;
        let pct = percent(self.processed, self.total);
        log::debug!("Exported {}/{} ({}%)", self.processed, self.total, pct);
        self.progress.report(pct);
    }

    /// Prepare every image of a question within the bounds.
    ///
    /// Results keep the image order; failures are returned per image.
    pub fn prepare_images(
        &self,
        question: &Question,
        max_width: u32,
        max_height: u32,
        encoding: TargetEncoding,
    ) -> Vec<Result<PreparedImage>> {
        let processor = self.processor;
        let prepare =
            |asset: &ImageAsset| processor.prepare(asset, max_width, max_height, encoding);
        if self.options.parallel && question.image_count() > 1 {
            question.images().par_iter().map(prepare).collect()
        } else {
            question.images().iter().map(prepare).collect()
        }
    }
}

/// Trait for export encoders.
///
/// Implement this trait to add support for a new output format.
pub trait Encoder: Send + Sync {
    /// The format this encoder produces.
    fn format(&self) -> ExportFormat;

    /// Encode the questions into an in-memory buffer.
    ///
    /// Implementations call [`EncodeContext::check_cancelled`] before and
    /// [`EncodeContext::question_done`] after each question.
    fn encode(&self, questions: &[Question], ctx: &mut EncodeContext<'_>) -> Result<Vec<u8>>;
}

/// Registry of encoders and entry point for exports.
pub struct ExportEngine {
    encoders: HashMap<ExportFormat, Arc<dyn Encoder>>,
    processor: ImageProcessor,
}

impl ExportEngine {
    /// Create a new empty engine.
    pub fn new() -> Self {
        Self {
            encoders: HashMap::new(),
            processor: ImageProcessor::new(),
        }
    }

    /// Create an engine with all five encoders.
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.register(Arc::new(DocxEncoder::new()));
        engine.register(Arc::new(PdfEncoder::new()));
        engine.register(Arc::new(TextEncoder::new()));
        engine.register(Arc::new(HtmlEncoder::new()));
        engine.register(Arc::new(JsonEncoder::new()));
        engine
    }

    /// Use a specific image processor, e.g. one backed by a shared cache.
    pub fn with_processor(mut self, processor: ImageProcessor) -> Self {
        self.processor = processor;
        self
    }

    /// Register an encoder, replacing any encoder for the same format.
    pub fn register(&mut self, encoder: Arc<dyn Encoder>) {
        self.encoders.insert(encoder.format(), encoder);
    }

    /// Get the encoder for a format.
    pub fn get(&self, format: ExportFormat) -> Option<Arc<dyn Encoder>> {
        self.encoders.get(&format).cloned()
    }

    /// Check if a format is supported.
    pub fn supports(&self, format: ExportFormat) -> bool {
        self.encoders.contains_key(&format)
    }

    /// Encode questions into memory without writing anything.
    pub fn encode(
        &self,
        questions: &[Question],
        options: &ExportOptions,
        progress: &mut dyn ProgressSink,
    ) -> Result<(Vec<u8>, ExportSummary)> {
        self.encode_inner(questions, options, progress, None)
    }

    /// Export questions to `destination`.
    pub fn export(
        &self,
        questions: &[Question],
        options: &ExportOptions,
        destination: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<ExportSummary> {
        self.export_inner(questions, options, destination, progress, None)
    }

    pub(crate) fn export_inner(
        &self,
        questions: &[Question],
        options: &ExportOptions,
        destination: &Path,
        progress: &mut dyn ProgressSink,
        cancel: Option<&AtomicBool>,
    ) -> Result<ExportSummary> {
        let (bytes, mut summary) = self.encode_inner(questions, options, progress, cancel)?;
        std::fs::write(destination, &bytes)?;

        summary.bytes_written = bytes.len();
        summary.destination = Some(destination.to_path_buf());
        log::info!(
            "Exported {} questions as {} to {} ({} bytes)",
            summary.questions,
            options.format,
            destination.display(),
            summary.bytes_written
        );
        Ok(summary)
    }

    fn encode_inner(
        &self,
        questions: &[Question],
        options: &ExportOptions,
        progress: &mut dyn ProgressSink,
        cancel: Option<&AtomicBool>,
    ) -> Result<(Vec<u8>, ExportSummary)> {
        if questions.is_empty() {
            return Err(Error::NothingToExport);
        }

        let encoder = self
            .get(options.format)
            .ok_or_else(|| Error::Other(format!("No encoder for format: {}", options.format)))?;

        let mut ctx = EncodeContext::new(options, &self.processor, progress, questions.len());
        if let Some(flag) = cancel {
            ctx = ctx.with_cancel(flag);
        }

        let bytes = encoder.encode(questions, &mut ctx)?;
        let mut summary = ctx.summary;
        summary.bytes_written = bytes.len();
        Ok((bytes, summary))
    }
}

impl Default for ExportEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}
