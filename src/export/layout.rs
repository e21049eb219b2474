//! Page geometry shared by the encoders.

/// A4 page height in inches.
pub const A4_HEIGHT_IN: f64 = 11.69;

/// Fraction of the page height an image may occupy.
pub const PAGE_FRACTION: f64 = 0.25;

/// Working resolution of DOCX, HTML and JSON output.
pub const SCREEN_DPI: f64 = 96.0;

/// Working resolution of PDF output (1 px = 1 pt).
pub const PDF_DPI: f64 = 72.0;

/// A4 width in points.
pub const A4_WIDTH_PT: f32 = 595.2756;

/// A4 height in points.
pub const A4_HEIGHT_PT: f32 = 841.8898;

/// Points per centimetre.
pub const PT_PER_CM: f32 = 28.3465;

/// English Metric Units per pixel at 96 DPI.
pub const EMU_PER_PX: u64 = 9525;

/// Maximum image height in pixels at `dpi`: a quarter of the page height.
///
/// The page height is truncated to whole pixels before the fraction is taken,
/// giving 280 px at 96 DPI and 210 px at 72 DPI.
pub fn max_image_height_px(dpi: f64) -> u32 {
    let page_px = (A4_HEIGHT_IN * dpi).floor();
    (page_px * PAGE_FRACTION).floor() as u32
}

/// Pixel to EMU conversion for DOCX drawings.
pub fn px_to_emu(px: u32) -> u64 {
    px as u64 * EMU_PER_PX
}

/// Page margins in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Margins {
    /// 3 cm binding margin on the left, 1 cm elsewhere.
    pub fn question_sheet() -> Self {
        Self {
            left: 3.0 * PT_PER_CM,
            right: PT_PER_CM,
            top: PT_PER_CM,
            bottom: PT_PER_CM,
        }
    }
}
