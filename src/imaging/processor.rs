//! Image normalization and page-fraction scaling.

use super::cache::{CacheKey, ImageCache};
use crate::error::Result;
use crate::model::{ImageAsset, ImageFormat};
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView};
use std::io::Cursor;
use std::sync::Arc;

/// Encoding requested for a prepared image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TargetEncoding {
    /// Keep the source encoding unless the image had to be scaled
    #[default]
    Original,
    /// Always emit PNG
    Png,
}

/// An image ready for placement by an encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImage {
    /// Encoded rendition
    pub asset: ImageAsset,
    /// Whether the rendition was scaled down from the source
    pub scaled: bool,
}

/// Compute dimensions that fit within the bounds, preserving aspect ratio.
///
/// Images already inside the bounds are returned unchanged; nothing is ever
/// enlarged. Each scaled dimension is floored and kept at least 1.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 || (width <= max_width && height <= max_height) {
        return (width, height);
    }

    // ratio = min(max_w / w, max_h / h), evaluated in integers so the binding
    // dimension lands exactly on its bound
    let (w, h) = (width as u64, height as u64);
    let (max_w, max_h) = (max_width as u64, max_height as u64);
    let (scaled_w, scaled_h) = if max_h * w <= max_w * h {
        (w * max_h / h, max_h)
    } else {
        (max_w, h * max_w / w)
    };
    ((scaled_w as u32).max(1), (scaled_h as u32).max(1))
}

/// Shrink an image to fit within the bounds with a Lanczos3 filter.
///
/// Returns the image and whether it was resized.
pub fn scale_to_page_fraction(
    image: DynamicImage,
    max_width: u32,
    max_height: u32,
) -> (DynamicImage, bool) {
    let (width, height) = image.dimensions();
    let (new_w, new_h) = fit_within(width, height, max_width, max_height);
    if (new_w, new_h) == (width, height) {
        return (image, false);
    }
    (image.resize_exact(new_w, new_h, FilterType::Lanczos3), true)
}

/// Decodes, normalizes and scales embedded images.
#[derive(Debug, Clone, Default)]
pub struct ImageProcessor {
    cache: Option<Arc<ImageCache>>,
}

impl ImageProcessor {
    /// Create a processor without a cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a processor backed by a shared cache.
    pub fn with_cache(cache: Arc<ImageCache>) -> Self {
        Self { cache: Some(cache) }
    }

    /// The cache backing this processor, if any.
    pub fn cache(&self) -> Option<&Arc<ImageCache>> {
        self.cache.as_ref()
    }

    /// Decode raw bytes into an asset with an accepted format.
    ///
    /// PNG, JPEG, GIF and BMP data is kept as-is; any other decodable format
    /// is re-encoded to PNG. Undecodable data is an error.
    pub fn normalize(&self, data: &[u8]) -> Result<ImageAsset> {
        let key = CacheKey::normalized(data);
        if let Some(hit) = self.lookup(&key) {
            return Ok(hit.asset);
        }

        let source_format = image::guess_format(data)?;
        let decoded = image::load_from_memory_with_format(data, source_format)?;
        let (width, height) = decoded.dimensions();

        let asset = match ImageFormat::from_decoded(source_format) {
            Some(format) => ImageAsset::new(data.to_vec(), format, width, height),
            None => {
                log::debug!("Re-encoding {:?} image as PNG", source_format);
                ImageAsset::new(encode_png(&decoded)?, ImageFormat::Png, width, height)
            }
        };

        self.store(
            key,
            PreparedImage {
                asset: asset.clone(),
                scaled: false,
            },
        );
        Ok(asset)
    }

    /// Produce a rendition of `asset` that fits within the bounds.
    pub fn prepare(
        &self,
        asset: &ImageAsset,
        max_width: u32,
        max_height: u32,
        encoding: TargetEncoding,
    ) -> Result<PreparedImage> {
        let key = CacheKey::prepared(&asset.data, max_width, max_height, encoding);
        if let Some(hit) = self.lookup(&key) {
            return Ok(hit);
        }

        let (fit_w, fit_h) = fit_within(asset.width, asset.height, max_width, max_height);
        let needs_scale = (fit_w, fit_h) != (asset.width, asset.height);
        let keep_bytes = encoding == TargetEncoding::Original || asset.format == ImageFormat::Png;

        let prepared = if !needs_scale && keep_bytes {
            PreparedImage {
                asset: asset.clone(),
                scaled: false,
            }
        } else {
            let decoded = self.decode(asset)?;
            let (image, scaled) = scale_to_page_fraction(decoded, max_width, max_height);
            let (width, height) = image.dimensions();
            PreparedImage {
                asset: ImageAsset::new(encode_png(&image)?, ImageFormat::Png, width, height),
                scaled,
            }
        };

        self.store(key, prepared.clone());
        Ok(prepared)
    }

    /// Decode an asset into pixels.
    pub fn decode(&self, asset: &ImageAsset) -> Result<DynamicImage> {
        Ok(image::load_from_memory(&asset.data)?)
    }

    fn lookup(&self, key: &CacheKey) -> Option<PreparedImage> {
        self.cache.as_ref().and_then(|cache| cache.get(key))
    }

    fn store(&self, key: CacheKey, image: PreparedImage) {
        if let Some(cache) = &self.cache {
            cache.insert(key, image);
        }
    }
}

/// Encode pixels as PNG.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    match image.color() {
        // PNG has no float sample type
        ColorType::Rgb32F | ColorType::Rgba32F => {
            DynamicImage::ImageRgba8(image.to_rgba8()).write_to(&mut buffer, image::ImageFormat::Png)?
        }
        _ => image.write_to(&mut buffer, image::ImageFormat::Png)?,
    }
    Ok(buffer.into_inner())
}
