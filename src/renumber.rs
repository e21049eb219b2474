//! Question number rewriting.
//!
//! Question texts usually open with a label and a number, e.g. `Aufgabe 17`.
//! When exporting a subset, sequential numbering rewrites that number to the
//! question's position in the export.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default label preceding a question number.
pub const DEFAULT_LABEL: &str = "Aufgabe";

/// How question numbers are written on export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberingMode {
    /// Keep the numbers found in the source
    #[default]
    Original,
    /// Renumber 1, 2, 3, ... in export order
    Sequential,
}

impl NumberingMode {
    /// Check if numbers are rewritten.
    pub fn is_sequential(&self) -> bool {
        matches!(self, NumberingMode::Sequential)
    }
}

impl FromStr for NumberingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "original" => Ok(NumberingMode::Original),
            "sequential" => Ok(NumberingMode::Sequential),
            other => Err(format!("unknown numbering mode: {}", other)),
        }
    }
}

/// Rewrite the question number in `text` for the question at `index` (0-based).
///
/// In sequential mode the first `label` (case-insensitive), optionally
/// followed by whitespace, then a run of ASCII digits has its digits replaced
/// with `index + 1`. Everything else is left untouched, and text without such
/// a pattern is returned unchanged.
///
/// # Example
/// ```
/// use qbank::renumber::{renumber, NumberingMode};
///
/// let text = renumber("Aufgabe 17: Berechne", 2, NumberingMode::Sequential, "Aufgabe");
/// assert_eq!(text, "Aufgabe 3: Berechne");
/// ```
pub fn renumber(text: &str, index: usize, mode: NumberingMode, label: &str) -> String {
    if mode == NumberingMode::Original || label.is_empty() {
        return text.to_string();
    }

    match find_number(text, label) {
        Some((start, end)) => {
            let mut out = String::with_capacity(text.len() + 4);
            out.push_str(&text[..start]);
            out.push_str(&(index + 1).to_string());
            out.push_str(&text[end..]);
            out
        }
        None => text.to_string(),
    }
}

/// Byte range of the digit run following the first matching label.
fn find_number(text: &str, label: &str) -> Option<(usize, usize)> {
    for (offset, _) in text.char_indices() {
        let Some(after_label) = match_label(&text[offset..], label) else {
            continue;
        };
        let rest = &text[offset + after_label..];
        let ws = rest.len() - rest.trim_start().len();
        let digits = rest[ws..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        if ws > 0 && digits > 0 {
            let start = offset + after_label + ws;
            return Some((start, start + digits));
        }
    }
    None
}

/// If `haystack` starts with `label` ignoring case, return the matched byte length.
fn match_label(haystack: &str, label: &str) -> Option<usize> {
    let mut chars = haystack.char_indices();
    for expected in label.chars() {
        let (_, actual) = chars.next()?;
        if actual != expected && !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    Some(chars.next().map(|(i, _)| i).unwrap_or(haystack.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(text: &str, index: usize) -> String {
        renumber(text, index, NumberingMode::Sequential, DEFAULT_LABEL)
    }

    #[test]
    fn test_sequential_replaces_first_number() {
        assert_eq!(seq("Aufgabe 17\nText", 0), "Aufgabe 1\nText");
        assert_eq!(seq("Aufgabe 5 und Aufgabe 6", 3), "Aufgabe 4 und Aufgabe 6");
    }

    #[test]
    fn test_case_insensitive_label() {
        assert_eq!(seq("AUFGABE 9", 1), "AUFGABE 2");
        assert_eq!(seq("siehe aufgabe 12)", 9), "siehe aufgabe 10)");
    }

    #[test]
    fn test_whitespace_between_label_and_digits() {
        assert_eq!(seq("Aufgabe\t 08.", 0), "Aufgabe\t 1.");
        assert_eq!(seq("Aufgabe7", 6), "Aufgabe7");
        assert_eq!(seq("Aufgabe42 und Aufgabe 7", 0), "Aufgabe42 und Aufgabe 1");
    }

    #[test]
    fn test_label_without_number_is_skipped() {
        assert_eq!(seq("Aufgabe: siehe Aufgabe 4", 0), "Aufgabe: siehe Aufgabe 1");
        assert_eq!(seq("Keine Nummer hier", 0), "Keine Nummer hier");
        assert_eq!(seq("Aufgabe x", 0), "Aufgabe x");
    }

    #[test]
    fn test_original_mode_is_identity() {
        let text = "Aufgabe 17";
        assert_eq!(renumber(text, 0, NumberingMode::Original, DEFAULT_LABEL), text);
    }

    #[test]
    fn test_multibyte_text() {
        assert_eq!(seq("Übung – Aufgabe 3 (ä)", 4), "Übung – Aufgabe 5 (ä)");
        assert_eq!(
            renumber("Задача 7", 0, NumberingMode::Sequential, "задача"),
            "Задача 1"
        );
    }

    #[test]
    fn test_custom_label() {
        assert_eq!(
            renumber("Question 12. What", 1, NumberingMode::Sequential, "question"),
            "Question 2. What"
        );
    }

    #[test]
    fn test_numbering_mode_from_str() {
        assert_eq!("Sequential".parse::<NumberingMode>(), Ok(NumberingMode::Sequential));
        assert_eq!("original".parse::<NumberingMode>(), Ok(NumberingMode::Original));
        assert!("other".parse::<NumberingMode>().is_err());
    }
}
