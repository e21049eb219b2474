//! DOCX question parsing module.
//!
//! A [`DocxPackage`] supplies the paragraph stream and image parts; the
//! [`QuestionParser`] groups paragraphs between delimiters into questions.

mod docx_parser;
mod options;
mod package;
mod paragraphs;
mod question_parser;
mod report;

pub use docx_parser::{DocxParser, ParsedDocument};
pub use options::{ParseOptions, DEFAULT_END_DELIMITER, DEFAULT_START_DELIMITER};
pub use package::{DocxPackage, ImageSource, Relationship};
pub use paragraphs::read_paragraphs;
pub use question_parser::{normalize_delimiter, QuestionParser};
pub use report::{Anomaly, ParseReport};
