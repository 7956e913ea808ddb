//! Best-overlap search over a pool snapshot.

use std::cmp::Ordering;

use serde::Serialize;

use crate::affix::PrefixIndex;
use crate::pool::PoolSnapshot;
use crate::sequence::{Sequence, SequenceId};
use crate::similarity::{evaluate_against, SimilarityMode, WindowScore};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Which ends of the two sequences meet. Only suffix-to-prefix is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// The suffix of `left` meets the prefix of `right`.
    SuffixPrefix,
}

/// A scored overlap between two active sequences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlapCandidate {
    pub left: SequenceId,
    pub right: SequenceId,
    pub orientation: Orientation,
    pub overlap_length: usize,
    pub score: f64,
    pub mismatches: usize,
}

impl OverlapCandidate {
    fn new(left: SequenceId, right: SequenceId, overlap_length: usize, window: WindowScore) -> Self {
        Self {
            left,
            right,
            orientation: Orientation::SuffixPrefix,
            overlap_length,
            score: window.score,
            mismatches: window.mismatches,
        }
    }

    /// Total preference order; `Greater` means `self` is the better merge.
    ///
    /// Longer overlaps always win, then higher scores, then the lowest
    /// `(left, right)` id pair.
    pub fn preference(&self, other: &Self) -> Ordering {
        self.overlap_length
            .cmp(&other.overlap_length)
            .then_with(|| self.score.total_cmp(&other.score))
            .then_with(|| other.left.cmp(&self.left))
            .then_with(|| other.right.cmp(&self.right))
    }
}

/// Keep whichever candidate ranks higher.
pub fn pick_better(
    current: Option<OverlapCandidate>,
    challenger: Option<OverlapCandidate>,
) -> Option<OverlapCandidate> {
    match (current, challenger) {
        (Some(a), Some(b)) => {
            if b.preference(&a) == Ordering::Greater {
                Some(b)
            } else {
                Some(a)
            }
        }
        (a, None) => a,
        (None, b) => b,
    }
}

/// Options that govern one scan.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    /// Shortest overlap ever accepted.
    pub min_overlap_length: usize,
    /// Longest overlap tried.
    pub max_overlap_length: usize,
    /// Prune exact-mode candidates through a [`PrefixIndex`].
    pub use_prefix_index: bool,
    /// Shard left sequences over rayon workers (needs the `parallel` feature).
    pub use_threads: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            min_overlap_length: crate::config::DEFAULT_MIN_OVERLAP_LEN,
            max_overlap_length: usize::MAX,
            use_prefix_index: true,
            use_threads: false,
        }
    }
}

impl ScanOptions {
    #[inline]
    fn min_len(&self) -> usize {
        self.min_overlap_length.max(1)
    }

    /// Longest overlap worth testing between `left` and `right`.
    #[inline]
    fn upper_len(&self, left: &Sequence, right: &Sequence) -> usize {
        self.max_overlap_length.min(left.len()).min(right.len())
    }
}

/// Find the single best overlap in `snapshot` that reaches `floor`.
///
/// Every ordered pair of distinct sequences is considered; for each pair the
/// longest clearing length wins, and pairs are ranked by
/// [`OverlapCandidate::preference`].
pub fn find_best_overlap(
    snapshot: &PoolSnapshot,
    floor: f64,
    options: &ScanOptions,
) -> Option<OverlapCandidate> {
    if snapshot.len() < 2 {
        return None;
    }
    let mode = SimilarityMode::for_floor(floor);
    let sequences = snapshot.to_vec();
    let index = (mode == SimilarityMode::Exact && options.use_prefix_index)
        .then(|| PrefixIndex::build(sequences.iter().copied(), options.min_len()));

    let scan_left = |left: &&Sequence| -> Option<OverlapCandidate> {
        match &index {
            Some(index) => best_exact_from_index(left, snapshot, index, options),
            None => best_for_left(left, &sequences, mode, floor, options),
        }
    };

    #[cfg(feature = "parallel")]
    if options.use_threads {
        return sequences
            .par_iter()
            .map(scan_left)
            .reduce(|| None, pick_better);
    }

    #[cfg(not(feature = "parallel"))]
    if options.use_threads {
        log::warn!(
            "Threaded overlap scan requested, but the 'parallel' feature is not enabled; scanning sequentially"
        );
    }

    sequences.iter().map(scan_left).fold(None, pick_better)
}

/// Longest clearing overlap of `left`'s suffix with `right`'s prefix,
/// trying lengths from `upper` down to `lower`.
fn best_pair_overlap(
    left: &Sequence,
    right: &Sequence,
    upper: usize,
    lower: usize,
    mode: SimilarityMode,
    floor: f64,
) -> Option<OverlapCandidate> {
    (lower..=upper).rev().find_map(|span| {
        evaluate_against(left.suffix(span), right.prefix(span), mode, floor)
            .map(|window| OverlapCandidate::new(left.id(), right.id(), span, window))
    })
}

/// Exhaustive scan of `left` against every other sequence.
fn best_for_left(
    left: &Sequence,
    sequences: &[&Sequence],
    mode: SimilarityMode,
    floor: f64,
    options: &ScanOptions,
) -> Option<OverlapCandidate> {
    let min_len = options.min_len();
    let mut best: Option<OverlapCandidate> = None;

    for right in sequences {
        if right.id() == left.id() {
            continue;
        }
        let upper = options.upper_len(left, right);
        // A pair that cannot reach the current best length can never win.
        let lower = best.map_or(min_len, |b| b.overlap_length.max(min_len));
        if upper < lower {
            continue;
        }
        best = pick_better(best, best_pair_overlap(left, right, upper, lower, mode, floor));
    }
    best
}

/// Exact-mode scan of `left` restricted to sequences whose prefix anchor
/// occurs at the matching offset of `left`.
fn best_exact_from_index(
    left: &Sequence,
    snapshot: &PoolSnapshot,
    index: &PrefixIndex<'_>,
    options: &ScanOptions,
) -> Option<OverlapCandidate> {
    let anchor_len = index.anchor_len();
    let min_len = options.min_len().max(anchor_len);
    let max_len = options.max_overlap_length.min(left.len());
    if max_len < min_len {
        return None;
    }

    // Offsets ascend, so spans descend: the first verified hit is the longest.
    for span in (min_len..=max_len).rev() {
        let start = left.len() - span;
        let anchor = &left.content()[start..start + anchor_len];
        let window = left.suffix(span);
        for &right_id in index.candidates(anchor) {
            if right_id == left.id() {
                continue;
            }
            let Some(right) = snapshot.get(right_id) else {
                continue;
            };
            if span > right.len() {
                continue;
            }
            if window == right.prefix(span) {
                return Some(OverlapCandidate::new(
                    left.id(),
                    right_id,
                    span,
                    WindowScore::PERFECT,
                ));
            }
        }
    }
    None
}
