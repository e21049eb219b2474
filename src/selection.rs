//! Choosing which questions to export.

use crate::error::{Error, Result};
use crate::model::Question;
use rand::rngs::StdRng;
use rand::{seq::index, SeedableRng};

/// A criterion for picking questions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Every question
    #[default]
    All,
    /// Specific question numbers (1-based, sorted, unique)
    Numbers(Vec<usize>),
    /// Questions whose text contains the needle, ignoring case
    Search(String),
    /// `count` questions chosen at random, kept in document order
    Random { count: usize, seed: Option<u64> },
}

impl Selection {
    /// Parse a number list such as `"1,3,5-7"` or `"all"`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(Selection::All);
        }

        let invalid = |part: &str| Error::InvalidSelection(format!("invalid question number: {}", part));

        let mut numbers = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if let Some((start, end)) = part.split_once('-') {
                let start: usize = start.trim().parse().map_err(|_| invalid(part))?;
                let end: usize = end.trim().parse().map_err(|_| invalid(part))?;
                if start == 0 || end < start {
                    return Err(Error::InvalidSelection(format!("invalid range: {}", part)));
                }
                numbers.extend(start..=end);
            } else {
                let n: usize = part.parse().map_err(|_| invalid(part))?;
                if n == 0 {
                    return Err(invalid(part));
                }
                numbers.push(n);
            }
        }

        numbers.sort_unstable();
        numbers.dedup();
        Ok(Selection::Numbers(numbers))
    }

    /// Case-insensitive text search.
    pub fn search(needle: impl Into<String>) -> Self {
        Selection::Search(needle.into())
    }

    /// Random sample of `count` questions.
    pub fn random(count: usize, seed: Option<u64>) -> Self {
        Selection::Random { count, seed }
    }

    /// Narrow `candidates` (0-based indices into `questions`) by this criterion.
    fn narrow(&self, questions: &[Question], candidates: Vec<usize>) -> Result<Vec<usize>> {
        match self {
            Selection::All => Ok(candidates),
            Selection::Numbers(numbers) => {
                if let Some(&n) = numbers.iter().find(|&&n| n > questions.len()) {
                    return Err(Error::InvalidSelection(format!(
                        "question {} does not exist (document has {})",
                        n,
                        questions.len()
                    )));
                }
                Ok(candidates
                    .into_iter()
                    .filter(|i| numbers.binary_search(&(i + 1)).is_ok())
                    .collect())
            }
            Selection::Search(needle) => Ok(candidates
                .into_iter()
                .filter(|&i| questions[i].matches(needle))
                .collect()),
            Selection::Random { count, seed } => {
                if *count == 0 {
                    return Err(Error::InvalidSelection(
                        "random sample size must be at least 1".into(),
                    ));
                }
                if *count > candidates.len() {
                    return Err(Error::InvalidSelection(format!(
                        "only {} questions available, cannot pick {}",
                        candidates.len(),
                        count
                    )));
                }
                let mut rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(*seed),
                    None => StdRng::from_entropy(),
                };
                let mut picked: Vec<usize> = index::sample(&mut rng, candidates.len(), *count)
                    .into_vec()
                    .into_iter()
                    .map(|k| candidates[k])
                    .collect();
                picked.sort_unstable();
                Ok(picked)
            }
        }
    }
}

/// Apply criteria in order, each narrowing the previous result.
///
/// Returns 0-based indices into `questions` in document order.
pub fn select(questions: &[Question], criteria: &[Selection]) -> Result<Vec<usize>> {
    let mut candidates: Vec<usize> = (0..questions.len()).collect();
    for criterion in criteria {
        candidates = criterion.narrow(questions, candidates)?;
    }
    log::debug!("Selected {} of {} questions", candidates.len(), questions.len());
    Ok(candidates)
}

/// Clone the questions at `indices`.
pub fn pick(questions: &[Question], indices: &[usize]) -> Vec<Question> {
    indices
        .iter()
        .filter_map(|&i| questions.get(i).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(n: usize) -> Vec<Question> {
        (1..=n)
            .map(|i| {
                let body = if i % 2 == 0 { "Geometrie" } else { "Algebra" };
                Question::text_only(format!("Aufgabe {}\n{}", i, body))
            })
            .collect()
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(Selection::parse("all").unwrap(), Selection::All);
        assert_eq!(Selection::parse("").unwrap(), Selection::All);
        assert_eq!(
            Selection::parse("7, 1,3,5-7").unwrap(),
            Selection::Numbers(vec![1, 3, 5, 6, 7])
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(Selection::parse("0"), Err(Error::InvalidSelection(_))));
        assert!(Selection::parse("5-2").is_err());
        assert!(Selection::parse("a,b").is_err());
        assert!(Selection::parse("1-").is_err());
    }

    #[test]
    fn test_select_numbers() {
        let qs = questions(6);
        let picked = select(&qs, &[Selection::parse("2,4-5").unwrap()]).unwrap();
        assert_eq!(picked, vec![1, 3, 4]);

        let out_of_range = select(&qs, &[Selection::parse("9").unwrap()]);
        assert!(matches!(out_of_range, Err(Error::InvalidSelection(_))));
    }

    #[test]
    fn test_search_then_numbers() {
        let qs = questions(6);
        let picked = select(
            &qs,
            &[Selection::search("GEOMETRIE"), Selection::parse("1-4").unwrap()],
        )
        .unwrap();
        assert_eq!(picked, vec![1, 3]);
    }

    #[test]
    fn test_random_is_seeded_and_ordered() {
        let qs = questions(30);
        let a = select(&qs, &[Selection::random(10, Some(42))]).unwrap();
        let b = select(&qs, &[Selection::random(10, Some(42))]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_random_too_many() {
        let qs = questions(3);
        assert!(select(&qs, &[Selection::random(4, Some(1))]).is_err());
        assert!(select(&qs, &[Selection::random(0, None)]).is_err());
        assert_eq!(select(&qs, &[Selection::random(3, None)]).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_pick() {
        let qs = questions(4);
        let picked = pick(&qs, &[3, 0]);
        assert_eq!(picked[0].text(), "Aufgabe 4\nGeometrie");
        assert_eq!(picked[1].text(), "Aufgabe 1\nAlgebra");
    }
}
