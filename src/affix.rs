//! Prefix index used to prune exact-match overlap candidates.
//!
//! An exact overlap of length `L >= k` between the suffix of `A` and the
//! prefix of `B` requires `A[|A|-L..|A|-L+k] == B[..k]`. Indexing every
//! sequence by its first `k` symbols turns the inner pair loop into a hash
//! lookup per start offset of `A`.

use std::collections::HashMap;

use crate::sequence::{Sequence, SequenceId};

/// Map from a `k`-symbol prefix to the ids of sequences starting with it.
#[derive(Debug, Clone)]
pub struct PrefixIndex<'a> {
    anchor_len: usize,
    by_prefix: HashMap<&'a str, Vec<SequenceId>>,
}

impl<'a> PrefixIndex<'a> {
    /// Index `sequences` by their first `anchor_len` symbols.
    ///
    /// Sequences shorter than the anchor are skipped: they can never take
    /// part in an overlap of at least `anchor_len` symbols. Id lists keep
    /// the input order, so ascending input gives ascending ids.
    pub fn build<I>(sequences: I, anchor_len: usize) -> Self
    where
        I: IntoIterator<Item = &'a Sequence>,
    {
        let anchor_len = anchor_len.max(1);
        let mut by_prefix: HashMap<&'a str, Vec<SequenceId>> = HashMap::new();
        for seq in sequences {
            if seq.len() < anchor_len {
                continue;
            }
            by_prefix
                .entry(seq.prefix(anchor_len))
                .or_default()
                .push(seq.id());
        }
        log::trace!(
            "Prefix index built: {} distinct anchors of length {}",
            by_prefix.len(),
            anchor_len
        );
        Self {
            anchor_len,
            by_prefix,
        }
    }

    pub fn anchor_len(&self) -> usize {
        self.anchor_len
    }

    /// Ids of sequences whose prefix equals `anchor`.
    pub fn candidates(&self, anchor: &str) -> &[SequenceId] {
        self.by_prefix
            .get(anchor)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Number of distinct anchors.
    pub fn len(&self) -> usize {
        self.by_prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_prefix.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_sequences_by_prefix() {
        let reads = vec![
            Sequence::from_read(0, "ACGTT"),
            Sequence::from_read(1, "ACGAA"),
            Sequence::from_read(2, "TTTTT"),
        ];
        let index = PrefixIndex::build(&reads, 3);
        assert_eq!(index.len(), 2);
        assert_eq!(index.candidates("ACG"), &[0, 1]);
        assert_eq!(index.candidates("TTT"), &[2]);
        assert!(index.candidates("GGG").is_empty());
    }

    #[test]
    fn skips_sequences_shorter_than_anchor() {
        let reads = vec![Sequence::from_read(0, "AC"), Sequence::from_read(1, "ACGT")];
        let index = PrefixIndex::build(&reads, 3);
        assert_eq!(index.candidates("ACG"), &[1]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn treats_zero_anchor_as_one() {
        let reads = vec![Sequence::from_read(0, "AC")];
        let index = PrefixIndex::build(&reads, 0);
        assert_eq!(index.anchor_len(), 1);
        assert_eq!(index.candidates("A"), &[0]);
    }
}
