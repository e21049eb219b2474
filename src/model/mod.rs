//! Data model shared by the parser and the exporters.
//!
//! Paragraphs are what the parser consumes, questions are what it produces,
//! and image assets travel with their question into every encoder.

mod image;
mod paragraph;
mod question;

pub use self::image::{ImageAsset, ImageFormat};
pub use paragraph::{InlineContent, Paragraph};
pub use question::{Question, IMAGE_MARKER};
