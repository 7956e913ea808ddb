//! Window similarity scoring.
//!
//! Only substitutions are modelled: overlaps are contiguous prefix/suffix
//! windows of equal length, so there is nothing for an indel to align.

use serde::Serialize;
use strsim::hamming;

/// Tolerance used when comparing a score against a floor.
pub const FLOOR_EPSILON: f64 = 1e-9;

/// How windows are compared in a given round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMode {
    /// Any mismatch rejects the window outright.
    Exact,
    /// Score is the fraction of matching positions.
    Substitution,
}

impl SimilarityMode {
    /// Exact comparison applies while the floor still demands a perfect match.
    pub fn for_floor(floor: f64) -> Self {
        if floor >= 1.0 - FLOOR_EPSILON {
            Self::Exact
        } else {
            Self::Substitution
        }
    }
}

/// Result of comparing two windows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowScore {
    /// Matches divided by window length, in `[0, 1]`.
    pub score: f64,
    pub mismatches: usize,
}

impl WindowScore {
    pub const PERFECT: WindowScore = WindowScore {
        score: 1.0,
        mismatches: 0,
    };
}

/// Compare two equal-length windows.
///
/// Returns `None` when the windows differ in length, are empty, or (in
/// exact mode) differ anywhere.
pub fn evaluate(left: &str, right: &str, mode: SimilarityMode) -> Option<WindowScore> {
    if left.is_empty() || left.len() != right.len() {
        return None;
    }
    match mode {
        SimilarityMode::Exact => (left == right).then_some(WindowScore::PERFECT),
        SimilarityMode::Substitution => {
            let mismatches = hamming(left, right).ok()?;
            let span = left.len();
            Some(WindowScore {
                score: (span - mismatches) as f64 / span as f64,
                mismatches,
            })
        }
    }
}

/// True when `score` reaches `floor`.
#[inline]
pub fn clears(score: f64, floor: f64) -> bool {
    score + FLOOR_EPSILON >= floor
}

/// Evaluate and keep the score only if it reaches `floor`.
pub fn evaluate_against(
    left: &str,
    right: &str,
    mode: SimilarityMode,
    floor: f64,
) -> Option<WindowScore> {
    evaluate(left, right, mode).filter(|window| clears(window.score, floor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_mode_accepts_only_identical_windows() {
        assert_eq!(
            evaluate("ACGT", "ACGT", SimilarityMode::Exact),
            Some(WindowScore::PERFECT)
        );
        assert_eq!(evaluate("ACGT", "ACGA", SimilarityMode::Exact), None);
    }

    #[test]
    fn substitution_mode_scores_fraction_of_matches() {
        let window = evaluate("ACGT", "ACGA", SimilarityMode::Substitution).expect("scored");
        assert_eq!(window.mismatches, 1);
        assert!((window.score - 0.75).abs() < f64::EPSILON);

        let window = evaluate("AAAA", "CCCC", SimilarityMode::Substitution).expect("scored");
        assert_eq!(window.mismatches, 4);
        assert_eq!(window.score, 0.0);
    }

    #[test]
    fn rejects_unequal_or_empty_windows() {
        assert_eq!(evaluate("ACG", "ACGT", SimilarityMode::Substitution), None);
        assert_eq!(evaluate("", "", SimilarityMode::Exact), None);
    }

    #[test]
    fn score_depends_only_on_window_content() {
        let short = evaluate("AC", "AG", SimilarityMode::Substitution).unwrap();
        let long = evaluate("ACACACAC", "AGAGAGAG", SimilarityMode::Substitution).unwrap();
        assert_eq!(short.score, long.score);
    }

    #[test]
    fn floor_comparison_tolerates_schedule_drift() {
        let floor = 1.0 - 0.05 * 5.0;
        assert!(clears(0.75, floor));
        assert!(!clears(0.7, floor));
        assert!(evaluate_against("ACGT", "ACGA", SimilarityMode::Substitution, 0.8).is_none());
    }

    #[test]
    fn mode_follows_floor() {
        assert_eq!(SimilarityMode::for_floor(1.0), SimilarityMode::Exact);
        assert_eq!(SimilarityMode::for_floor(0.95), SimilarityMode::Substitution);
    }
}
