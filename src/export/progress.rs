//! Progress reporting during export.

/// Receives export progress in percent (0..=100).
pub trait ProgressSink {
    /// Report progress.
    fn report(&mut self, percent: u8);
}

impl<F: FnMut(u8)> ProgressSink for F {
    fn report(&mut self, percent: u8) {
        self(percent)
    }
}

/// Sink that drops every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _percent: u8) {}
}

/// Percentage of `processed` out of `total`, rounded half to even.
pub fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let scaled = 100 * processed.min(total);
    let quotient = scaled / total;
    let remainder = scaled % total;
    let rounded = match (2 * remainder).cmp(&total) {
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal if quotient % 2 == 1 => quotient + 1,
        _ => quotient,
    };
    rounded as u8
}
