//! Merge an accepted overlap into a single consensus sequence.
//!
//! Consensus rule inside the overlap window: where the two inputs disagree,
//! the symbol of the longer input survives; on equal lengths `left` wins.

use serde::Serialize;

use crate::overlap::OverlapCandidate;
use crate::pool::{PoolError, SequencePool};
use crate::sequence::{Sequence, SequenceId};

/// What a merge produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub merged: SequenceId,
    pub merged_len: usize,
    /// Window positions where the inputs disagreed.
    pub resolved_mismatches: usize,
}

/// Which input supplies the window symbols on a mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Preferred {
    Left,
    Right,
}

fn preferred(left: &Sequence, right: &Sequence) -> Preferred {
    if right.len() > left.len() {
        Preferred::Right
    } else {
        Preferred::Left
    }
}

/// Content of `left` merged with `right` over `overlap_length` symbols,
/// together with the number of mismatching window positions.
pub fn consensus(left: &Sequence, right: &Sequence, overlap_length: usize) -> (String, usize) {
    let winner = preferred(left, right);
    let left_window = left.suffix(overlap_length).as_bytes();
    let right_window = right.prefix(overlap_length).as_bytes();

    let mut merged: Vec<u8> = Vec::with_capacity(left.len() + right.len() - overlap_length);
    merged.extend_from_slice(left.prefix(left.len() - overlap_length).as_bytes());

    let mut mismatches = 0;
    for (&l, &r) in left_window.iter().zip(right_window) {
        if l == r {
            merged.push(l);
            continue;
        }
        mismatches += 1;
        merged.push(match winner {
            Preferred::Left => l,
            Preferred::Right => r,
        });
    }

    merged.extend_from_slice(&right.content().as_bytes()[overlap_length..]);
    // Both inputs are ASCII, so every byte copied above is a full char.
    let content = merged.into_iter().map(char::from).collect();
    (content, mismatches)
}

/// Apply `candidate` to `pool`, replacing both inputs with their consensus.
pub fn merge_candidate(
    pool: &mut SequencePool,
    candidate: &OverlapCandidate,
) -> Result<MergeOutcome, PoolError> {
    let left = pool
        .get(candidate.left)
        .ok_or(PoolError::NotFound(candidate.left))?;
    let right = pool
        .get(candidate.right)
        .ok_or(PoolError::NotFound(candidate.right))?;

    let span = candidate.overlap_length;
    if candidate.left == candidate.right || span == 0 || span > left.len() || span > right.len() {
        return Err(PoolError::InvalidOverlap {
            left: candidate.left,
            right: candidate.right,
            left_len: left.len(),
            right_len: right.len(),
            overlap_length: span,
        });
    }

    let (left_len, right_len) = (left.len(), right.len());
    let (content, resolved_mismatches) = consensus(left, right, span);
    let origin = left.origin().union(right.origin()).copied().collect();

    let merged_id = pool.allocate_id();
    let merged = Sequence::merged(merged_id, content, origin);
    let merged_len = merged.len();

    log::trace!(
        "Merging {} (len {left_len}) + {} (len {right_len}) over {span} symbols -> {merged_id} (len {merged_len})",
        candidate.left,
        candidate.right,
    );

    pool.replace(&[candidate.left, candidate.right], merged)?;
    Ok(MergeOutcome {
        merged: merged_id,
        merged_len,
        resolved_mismatches,
    })
}
