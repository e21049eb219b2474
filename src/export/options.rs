//! Export options and configuration.

use crate::renumber::{NumberingMode, DEFAULT_LABEL};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Word document
    #[default]
    Docx,
    /// Paged PDF
    Pdf,
    /// Plain text
    Txt,
    /// Self-contained HTML page
    Html,
    /// JSON records
    Json,
}

impl ExportFormat {
    /// All formats, in menu order.
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Docx,
        ExportFormat::Pdf,
        ExportFormat::Txt,
        ExportFormat::Html,
        ExportFormat::Json,
    ];

    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Docx => "docx",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Txt => "txt",
            ExportFormat::Html => "html",
            ExportFormat::Json => "json",
        }
    }

    /// MIME type of the output.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Txt => "text/plain",
            ExportFormat::Html => "text/html",
            ExportFormat::Json => "application/json",
        }
    }

    /// Guess the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "docx" => Some(ExportFormat::Docx),
            "pdf" => Some(ExportFormat::Pdf),
            "txt" | "text" => Some(ExportFormat::Txt),
            "html" | "htm" => Some(ExportFormat::Html),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }

    /// Guess the format from a destination path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Docx => "DOCX",
            ExportFormat::Pdf => "PDF",
            ExportFormat::Txt => "TXT",
            ExportFormat::Html => "HTML",
            ExportFormat::Json => "JSON",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim_start_matches('.'))
            .ok_or_else(|| format!("unknown export format: {}", s))
    }
}

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Indented with two spaces
    #[default]
    Pretty,
    /// Single line
    Compact,
}

/// Options for one export.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Output format
    pub format: ExportFormat,

    /// How question numbers are written
    pub numbering: NumberingMode,

    /// Whether images are embedded
    pub include_images: bool,

    /// Label preceding question numbers
    pub label: String,

    /// JSON layout
    pub json_format: JsonFormat,

    /// Prepare the images of one question in parallel
    pub parallel: bool,
}

impl ExportOptions {
    /// Create export options for a format.
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    /// Set the output format.
    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the numbering mode.
    pub fn with_numbering(mut self, numbering: NumberingMode) -> Self {
        self.numbering = numbering;
        self
    }

    /// Renumber questions 1, 2, 3, ...
    pub fn sequential(mut self) -> Self {
        self.numbering = NumberingMode::Sequential;
        self
    }

    /// Enable or disable embedded images.
    pub fn with_images(mut self, include: bool) -> Self {
        self.include_images = include;
        self
    }

    /// Set the numbering label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the JSON layout.
    pub fn with_json_format(mut self, format: JsonFormat) -> Self {
        self.json_format = format;
        self
    }

    /// Enable or disable parallel image preparation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Docx,
            numbering: NumberingMode::Original,
            include_images: true,
            label: DEFAULT_LABEL.to_string(),
            json_format: JsonFormat::Pretty,
            parallel: true,
        }
    }
}
