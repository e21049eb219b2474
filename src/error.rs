//! Error types for qbank library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for qbank operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while parsing or exporting questions.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as a DOCX package.
    #[error("Unknown file format: not a valid DOCX document")]
    UnknownFormat,

    /// The zip container could not be read or written.
    #[error("Container error: {0}")]
    Container(String),

    /// A required package part is missing.
    #[error("Missing package part: {0}")]
    MissingPart(String),

    /// Malformed XML inside a package part.
    #[error("XML error: {0}")]
    Xml(String),

    /// Error decoding, scaling or encoding an image.
    #[error("Image error: {0}")]
    Image(String),

    /// Error while encoding an export format.
    #[error("Rendering error: {0}")]
    Render(String),

    /// Invalid question selection specification.
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    /// Export was requested for an empty question list.
    #[error("No questions selected for export")]
    NothingToExport,

    /// Another export is already writing to this destination.
    #[error("Export already in progress for {}", .0.display())]
    DestinationBusy(PathBuf),

    /// The export was cancelled before completion.
    #[error("export cancelled")]
    Cancelled,

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            zip::result::ZipError::FileNotFound => Error::MissingPart(err.to_string()),
            _ => Error::Container(err.to_string()),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err.to_string())
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::Render(format!("PDF: {}", err)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Render(format!("JSON serialization error: {}", err))
    }
}
