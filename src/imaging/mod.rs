//! Embedded image handling.
//!
//! The [`ImageProcessor`] turns raw image parts into [`ImageAsset`](crate::model::ImageAsset)s
//! during parsing and produces bounded renditions for the exporters. An
//! optional [`ImageCache`] shares that work across parses and exports.

mod cache;
mod processor;

pub use cache::{CacheKey, ImageCache};
pub use processor::{
    encode_png, fit_within, scale_to_page_fraction, ImageProcessor, PreparedImage, TargetEncoding,
};
