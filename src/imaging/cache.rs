//! Session-scoped cache of normalized and scaled image renditions.

use super::processor::{PreparedImage, TargetEncoding};
use md5::{Digest, Md5};
use std::collections::HashMap;
use std::sync::Mutex;

/// Identifies one rendition of one source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    digest: [u8; 16],
    kind: RenditionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RenditionKind {
    Normalized,
    Prepared {
        max_width: u32,
        max_height: u32,
        encoding: TargetEncoding,
    },
}

impl CacheKey {
    /// Key for the normalized form of `data`.
    pub fn normalized(data: &[u8]) -> Self {
        Self {
            digest: digest(data),
            kind: RenditionKind::Normalized,
        }
    }

    /// Key for a bounded rendition of `data`.
    pub fn prepared(data: &[u8], max_width: u32, max_height: u32, encoding: TargetEncoding) -> Self {
        Self {
            digest: digest(data),
            kind: RenditionKind::Prepared {
                max_width,
                max_height,
                encoding,
            },
        }
    }
}

fn digest(data: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Thread-safe store of image renditions.
///
/// A cache is created by the caller and handed to the parser and the
/// exporters as an `Arc<ImageCache>`; there is no process-wide instance.
#[derive(Debug, Default)]
pub struct ImageCache {
    entries: Mutex<HashMap<CacheKey, PreparedImage>>,
}

impl ImageCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a rendition.
    pub fn get(&self, key: &CacheKey) -> Option<PreparedImage> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    /// Store a rendition, replacing any previous entry.
    pub fn insert(&self, key: CacheKey, image: PreparedImage) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, image);
        }
    }

    /// Number of stored renditions.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every stored rendition.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageAsset, ImageFormat};

    fn prepared() -> PreparedImage {
        PreparedImage {
            asset: ImageAsset::new(vec![1, 2, 3], ImageFormat::Png, 2, 2),
            scaled: false,
        }
    }

    #[test]
    fn test_insert_get_clear() {
        let cache = ImageCache::new();
        let key = CacheKey::normalized(b"abc");
        assert!(cache.get(&key).is_none());

        cache.insert(key, prepared());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key), Some(prepared()));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_keys_distinguish_bounds_and_encoding() {
        let a = CacheKey::prepared(b"abc", 100, 280, TargetEncoding::Png);
        let b = CacheKey::prepared(b"abc", 100, 210, TargetEncoding::Png);
        let c = CacheKey::prepared(b"abc", 100, 280, TargetEncoding::Original);
        let d = CacheKey::prepared(b"abd", 100, 280, TargetEncoding::Png);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a, CacheKey::prepared(b"abc", 100, 280, TargetEncoding::Png));
        assert_ne!(CacheKey::normalized(b"abc"), a);
    }
}
