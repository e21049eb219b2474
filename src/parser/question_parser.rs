//! Delimiter state machine turning paragraphs into questions.

use super::options::ParseOptions;
use super::package::ImageSource;
use super::report::{Anomaly, ParseReport};
use crate::imaging::ImageProcessor;
use crate::model::{ImageAsset, Paragraph, Question, IMAGE_MARKER};
use rayon::prelude::*;
use unicode_normalization::UnicodeNormalization;

/// Normalize paragraph text for delimiter comparison (NFC, trimmed).
pub fn normalize_delimiter(text: &str) -> String {
    text.nfc().collect::<String>().trim().to_string()
}

/// Paragraphs collected between a start delimiter and its close.
struct RawBlock<'p> {
    start: usize,
    paragraphs: Vec<(usize, &'p Paragraph)>,
}

enum ParseState<'p> {
    Outside,
    Inside(RawBlock<'p>),
}

struct BlockOutcome {
    question: Option<Question>,
    anomalies: Vec<Anomaly>,
}

/// Extracts delimited questions from a paragraph stream.
///
/// Parsing is tolerant: malformed delimiters are recorded as anomalies and
/// never abort. The same input always yields the same questions.
#[derive(Debug, Clone)]
pub struct QuestionParser {
    options: ParseOptions,
    processor: ImageProcessor,
    start: String,
    end: String,
}

impl QuestionParser {
    /// Create a parser with the given options.
    pub fn new(options: ParseOptions) -> Self {
        let start = normalize_delimiter(&options.start_delimiter);
        let end = normalize_delimiter(&options.end_delimiter);
        Self {
            options,
            processor: ImageProcessor::new(),
            start,
            end,
        }
    }

    /// Use a specific image processor, e.g. one backed by a cache.
    pub fn with_processor(mut self, processor: ImageProcessor) -> Self {
        self.processor = processor;
        self
    }

    /// Get the parse options.
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parse paragraphs into questions.
    pub fn parse<S: ImageSource + ?Sized>(&self, paragraphs: &[Paragraph], images: &S) -> Vec<Question> {
        self.parse_with_report(paragraphs, images).0
    }

    /// Parse paragraphs into questions, returning diagnostics alongside.
    pub fn parse_with_report<S: ImageSource + ?Sized>(
        &self,
        paragraphs: &[Paragraph],
        images: &S,
    ) -> (Vec<Question>, ParseReport) {
        let mut report = ParseReport {
            paragraphs: paragraphs.len(),
            ..Default::default()
        };

        let blocks = self.collect_blocks(paragraphs, &mut report);
        report.blocks = blocks.len();

        let outcomes: Vec<BlockOutcome> = if self.options.parallel && blocks.len() > 1 {
            blocks
                .par_iter()
                .map(|block| self.build_block(block, images))
                .collect()
        } else {
            blocks
                .iter()
                .map(|block| self.build_block(block, images))
                .collect()
        };

        let mut questions = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            for anomaly in outcome.anomalies {
                report.push(anomaly);
            }
            questions.extend(outcome.question);
        }

        log::info!(
            "Parsed {} questions from {} blocks ({} paragraphs)",
            questions.len(),
            report.blocks,
            report.paragraphs
        );
        (questions, report)
    }

    /// Run the delimiter state machine, grouping paragraphs into blocks.
    fn collect_blocks<'p>(
        &self,
        paragraphs: &'p [Paragraph],
        report: &mut ParseReport,
    ) -> Vec<RawBlock<'p>> {
        let mut blocks = Vec::new();
        let mut state = ParseState::Outside;

        for (index, paragraph) in paragraphs.iter().enumerate() {
            let text = normalize_delimiter(&paragraph.plain_text());

            if text == self.start {
                if let ParseState::Inside(block) = state {
                    report.push(Anomaly::NestedStart { paragraph: index });
                    blocks.push(block);
                }
                state = ParseState::Inside(RawBlock {
                    start: index,
                    paragraphs: Vec::new(),
                });
            } else if text == self.end {
                match state {
                    ParseState::Inside(block) => blocks.push(block),
                    ParseState::Outside => report.push(Anomaly::UnmatchedEnd { paragraph: index }),
                }
                state = ParseState::Outside;
            } else if let ParseState::Inside(block) = &mut state {
                block.paragraphs.push((index, paragraph));
            }
        }

        if let ParseState::Inside(block) = state {
            report.push(Anomaly::UnterminatedBlock { start: block.start });
            blocks.push(block);
        }

        blocks
    }

    /// Turn one block into a question, resolving its images.
    fn build_block<S: ImageSource + ?Sized>(&self, block: &RawBlock<'_>, images: &S) -> BlockOutcome {
        let mut lines: Vec<String> = Vec::new();
        let mut assets: Vec<ImageAsset> = Vec::new();
        let mut anomalies = Vec::new();

        for &(index, paragraph) in &block.paragraphs {
            let resolved = if self.options.extract_images {
                self.resolve_images(index, paragraph, images, &mut anomalies)
            } else {
                Vec::new()
            };

            let mut text = paragraph.plain_text();
            if text.contains(IMAGE_MARKER) {
                // removal can splice a new marker together, e.g. "[BI[BILD]LD]"
                while text.contains(IMAGE_MARKER) {
                    text = text.replace(IMAGE_MARKER, "");
                }
                anomalies.push(Anomaly::ReservedMarker { paragraph: index });
            }
            let blank = text.trim().is_empty();

            if !resolved.is_empty() {
                if !blank {
                    lines.push(text);
                }
                for asset in resolved {
                    lines.push(IMAGE_MARKER.to_string());
                    assets.push(asset);
                }
            } else if !blank || !lines.is_empty() {
                lines.push(text);
            }
        }

        let question = if lines.is_empty() && assets.is_empty() {
            log::debug!("Block at paragraph {} is empty", block.start + 1);
            None
        } else {
            Some(Question::from_lines(lines, assets))
        };

        BlockOutcome {
            question,
            anomalies,
        }
    }

    fn resolve_images<S: ImageSource + ?Sized>(
        &self,
        index: usize,
        paragraph: &Paragraph,
        images: &S,
        anomalies: &mut Vec<Anomaly>,
    ) -> Vec<ImageAsset> {
        let mut resolved = Vec::new();
        for rel_id in paragraph.image_refs() {
            let asset = images
                .resolve(rel_id)
                .and_then(|data| self.processor.normalize(data));
            match asset {
                Ok(asset) => resolved.push(asset),
                Err(e) => anomalies.push(Anomaly::ImageSkipped {
                    paragraph: index,
                    rel_id: rel_id.to_string(),
                    reason: e.to_string(),
                }),
            }
        }
        resolved
    }
}

impl Default for QuestionParser {
    fn default() -> Self {
        Self::new(ParseOptions::default())
    }
}
