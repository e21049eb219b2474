//! Export outcome statistics.

use crate::imaging::PreparedImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Aggregate outcome of one export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSummary {
    /// Questions written
    pub questions: usize,

    /// Images placed in the output
    pub images_embedded: usize,

    /// Images that were scaled down before placement
    pub images_scaled: usize,

    /// Images that failed and were replaced by a placeholder
    pub images_replaced: usize,

    /// Images left out because images were disabled
    pub images_omitted: usize,

    /// Pages produced (PDF only)
    pub pages: usize,

    /// Size of the written output in bytes
    pub bytes_written: usize,

    /// Where the output was written
    pub destination: Option<PathBuf>,
}

impl ExportSummary {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a placed image.
    pub fn add_image(&mut self, image: &PreparedImage) {
        self.images_embedded += 1;
        if image.scaled {
            self.images_scaled += 1;
        }
    }

    /// Record a failed image replaced by a placeholder.
    pub fn add_replaced(&mut self) {
        self.images_replaced += 1;
    }

    /// Record images left out of the output.
    pub fn add_omitted(&mut self, count: usize) {
        self.images_omitted += count;
    }

    /// Increment page count.
    pub fn add_page(&mut self) {
        self.pages += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageAsset, ImageFormat};

    #[test]
    fn test_add_image() {
        let mut summary = ExportSummary::new();
        let image = |scaled| PreparedImage {
            asset: ImageAsset::new(vec![], ImageFormat::Png, 1, 1),
            scaled,
        };
        summary.add_image(&image(true));
        summary.add_image(&image(false));
        summary.add_replaced();
        summary.add_omitted(3);

        assert_eq!(summary.images_embedded, 2);
        assert_eq!(summary.images_scaled, 1);
        assert_eq!(summary.images_replaced, 1);
        assert_eq!(summary.images_omitted, 3);
    }
}
