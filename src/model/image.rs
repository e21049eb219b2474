//! Embedded image assets.

use serde::{Deserialize, Serialize};

/// An image owned by a question.
///
/// The format is always one of the accepted [`ImageFormat`]s; anything else is
/// re-encoded to PNG before an asset is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    /// Encoded image bytes, not carried in serialized form
    #[serde(skip_serializing, default)]
    pub data: Vec<u8>,

    /// Encoding of `data`
    pub format: ImageFormat,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,
}

impl ImageAsset {
    /// Create a new image asset.
    pub fn new(data: Vec<u8>, format: ImageFormat, width: u32, height: u32) -> Self {
        Self {
            data,
            format,
            width,
            height,
        }
    }

    /// Get the size of the encoded data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Get the MIME type of the encoded data.
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Get a suggested filename for this asset.
    pub fn suggested_filename(&self, id: &str) -> String {
        format!("{}.{}", id, self.format.extension())
    }
}

/// Accepted image encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Portable Network Graphics
    Png,
    /// JPEG
    Jpeg,
    /// Graphics Interchange Format
    Gif,
    /// Windows bitmap
    Bmp,
}

impl ImageFormat {
    /// Get the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
        }
    }

    /// Get the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
        }
    }

    /// Map a decoder-reported format onto the accepted set.
    ///
    /// Returns `None` for formats that must be normalized to PNG.
    pub fn from_decoded(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Png => Some(ImageFormat::Png),
            image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
            image::ImageFormat::Gif => Some(ImageFormat::Gif),
            image::ImageFormat::Bmp => Some(ImageFormat::Bmp),
            _ => None,
        }
    }

    /// Detect an accepted format from magic bytes.
    pub fn detect(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(ImageFormat::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }

        // GIF: GIF87a or GIF89a
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(ImageFormat::Gif);
        }

        // BMP: BM
        if data.starts_with(b"BM") {
            return Some(ImageFormat::Bmp);
        }

        None
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageFormat::Png => write!(f, "PNG"),
            ImageFormat::Jpeg => write!(f, "JPEG"),
            ImageFormat::Gif => write!(f, "GIF"),
            ImageFormat::Bmp => write!(f, "BMP"),
        }
    }
}
