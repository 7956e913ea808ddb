//! Immutable sequence values held by the pool.

use std::collections::BTreeSet;

use serde::Serialize;

/// Identifier of a read or merged sequence.
///
/// Reads receive their zero-based input position; merged sequences receive
/// fresh ids from [`crate::pool::SequencePool::allocate_id`].
pub type SequenceId = usize;

/// A read or contig: symbols plus the set of reads it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sequence {
    id: SequenceId,
    content: String,
    origin: BTreeSet<SequenceId>,
}

impl Sequence {
    /// Wrap a validated read. The read is its own, single, origin.
    pub(crate) fn from_read(id: SequenceId, content: impl Into<String>) -> Self {
        let content = content.into();
        debug_assert!(content.is_ascii(), "sequence {id} holds non-ASCII symbols");
        Self {
            id,
            content,
            origin: BTreeSet::from([id]),
        }
    }

    /// Build a merged sequence. `origin` should be the union of the inputs.
    pub(crate) fn merged(id: SequenceId, content: String, origin: BTreeSet<SequenceId>) -> Self {
        debug_assert!(content.is_ascii(), "sequence {id} holds non-ASCII symbols");
        Self {
            id,
            content,
            origin,
        }
    }

    pub fn id(&self) -> SequenceId {
        self.id
    }

    /// Upper-case ASCII symbols.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Original read ids subsumed by this sequence.
    pub fn origin(&self) -> &BTreeSet<SequenceId> {
        &self.origin
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Last `span` symbols. Caller guarantees `span <= len()`.
    #[inline]
    pub fn suffix(&self, span: usize) -> &str {
        &self.content[self.content.len() - span..]
    }

    /// First `span` symbols. Caller guarantees `span <= len()`.
    #[inline]
    pub fn prefix(&self, span: usize) -> &str {
        &self.content[..span]
    }
}
