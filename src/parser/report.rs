//! Parse diagnostics.

use serde::Serialize;
use std::fmt;

/// A structural irregularity found while parsing.
///
/// Anomalies never abort a parse; they are collected so callers can show them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// An end delimiter appeared outside any block.
    UnmatchedEnd { paragraph: usize },
    /// A start delimiter appeared inside an open block; the open block was closed.
    NestedStart { paragraph: usize },
    /// The document ended while a block was still open.
    UnterminatedBlock { start: usize },
    /// An image anchor could not be resolved or decoded.
    ImageSkipped {
        paragraph: usize,
        rel_id: String,
        reason: String,
    },
    /// Source text contained the reserved image marker, which was removed.
    ReservedMarker { paragraph: usize },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // paragraph numbers are shown 1-based
        match self {
            Anomaly::UnmatchedEnd { paragraph } => {
                write!(f, "paragraph {}: end delimiter without open block", paragraph + 1)
            }
            Anomaly::NestedStart { paragraph } => write!(
                f,
                "paragraph {}: start delimiter inside open block, previous block closed",
                paragraph + 1
            ),
            Anomaly::UnterminatedBlock { start } => write!(
                f,
                "block opened at paragraph {} was never closed",
                start + 1
            ),
            Anomaly::ImageSkipped {
                paragraph,
                rel_id,
                reason,
            } => write!(
                f,
                "paragraph {}: image {} skipped: {}",
                paragraph + 1,
                rel_id,
                reason
            ),
            Anomaly::ReservedMarker { paragraph } => write!(
                f,
                "paragraph {}: reserved image marker removed from text",
                paragraph + 1
            ),
        }
    }
}

/// Summary of one parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    /// Paragraphs scanned
    pub paragraphs: usize,
    /// Blocks seen, including empty ones
    pub blocks: usize,
    /// Images dropped because they could not be resolved or decoded
    pub images_skipped: usize,
    /// Anomalies in document order
    pub anomalies: Vec<Anomaly>,
}

impl ParseReport {
    /// Check if the document was well-formed.
    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }

    pub(crate) fn push(&mut self, anomaly: Anomaly) {
        log::warn!("{}", anomaly);
        if matches!(anomaly, Anomaly::ImageSkipped { .. }) {
            self.images_skipped += 1;
        }
        self.anomalies.push(anomaly);
    }
}
