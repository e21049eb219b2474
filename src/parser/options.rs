//! Parsing options and configuration.

/// Default paragraph text that opens a question block.
pub const DEFAULT_START_DELIMITER: &str = "---START---";

/// Default paragraph text that closes a question block.
pub const DEFAULT_END_DELIMITER: &str = "---END---";

/// Options for parsing question documents.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Paragraph text that opens a block
    pub start_delimiter: String,

    /// Paragraph text that closes a block
    pub end_delimiter: String,

    /// Whether to resolve embedded images
    pub extract_images: bool,

    /// Whether to resolve images of different blocks in parallel
    pub parallel: bool,
}

impl ParseOptions {
    /// Create new parse options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both block delimiters.
    pub fn with_delimiters(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_delimiter = start.into();
        self.end_delimiter = end.into();
        self
    }

    /// Enable or disable image extraction.
    pub fn with_images(mut self, extract: bool) -> Self {
        self.extract_images = extract;
        self
    }

    /// Extract text only; image anchors are ignored.
    pub fn text_only(mut self) -> Self {
        self.extract_images = false;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            start_delimiter: DEFAULT_START_DELIMITER.to_string(),
            end_delimiter: DEFAULT_END_DELIMITER.to_string(),
            extract_images: true,
            parallel: true,
        }
    }
}
