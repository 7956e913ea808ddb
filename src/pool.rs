//! The set of active sequences, stored as copy-on-write generations.
//!
//! Readers take a [`PoolSnapshot`] (a shared handle on one generation) and
//! scan it without locks. A mutation while a snapshot is alive clones the
//! map first, so a reader never sees a half-applied `replace`.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::sequence::{Sequence, SequenceId};

/// Internal consistency errors. Never expected from valid input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("sequence id {0} is already active in the pool")]
    DuplicateId(SequenceId),
    #[error("sequence id {0} is not active in the pool")]
    NotFound(SequenceId),
    #[error(
        "overlap of {overlap_length} symbols does not fit sequences {left} (len {left_len}) and {right} (len {right_len})"
    )]
    InvalidOverlap {
        left: SequenceId,
        right: SequenceId,
        left_len: usize,
        right_len: usize,
        overlap_length: usize,
    },
}

type Generation = BTreeMap<SequenceId, Arc<Sequence>>;

/// Mutable pool owned by the assembly loop.
#[derive(Debug, Default)]
pub struct SequencePool {
    sequences: Arc<Generation>,
    next_id: SequenceId,
    generation: u64,
}

impl SequencePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool from already validated sequences.
    pub fn from_sequences<I>(sequences: I) -> Result<Self, PoolError>
    where
        I: IntoIterator<Item = Sequence>,
    {
        let mut pool = Self::new();
        for seq in sequences {
            pool.insert(seq)?;
        }
        Ok(pool)
    }

    /// Add a sequence. Fails if its id is already active.
    pub fn insert(&mut self, seq: Sequence) -> Result<(), PoolError> {
        let id = seq.id();
        if self.sequences.contains_key(&id) {
            return Err(PoolError::DuplicateId(id));
        }
        self.next_id = self.next_id.max(id + 1);
        Arc::make_mut(&mut self.sequences).insert(id, Arc::new(seq));
        self.generation += 1;
        Ok(())
    }

    /// Remove an active sequence and hand it back.
    pub fn remove(&mut self, id: SequenceId) -> Result<Arc<Sequence>, PoolError> {
        if !self.sequences.contains_key(&id) {
            return Err(PoolError::NotFound(id));
        }
        let removed = Arc::make_mut(&mut self.sequences)
            .remove(&id)
            .ok_or(PoolError::NotFound(id))?;
        self.generation += 1;
        Ok(removed)
    }

    /// Remove every id in `old_ids` and insert `new_seq` as one step.
    ///
    /// All preconditions are checked before anything changes, so on error
    /// the pool is exactly as it was.
    pub fn replace(&mut self, old_ids: &[SequenceId], new_seq: Sequence) -> Result<(), PoolError> {
        for (idx, id) in old_ids.iter().enumerate() {
            if !self.sequences.contains_key(id) || old_ids[..idx].contains(id) {
                return Err(PoolError::NotFound(*id));
            }
        }
        let new_id = new_seq.id();
        if self.sequences.contains_key(&new_id) {
            return Err(PoolError::DuplicateId(new_id));
        }

        let map = Arc::make_mut(&mut self.sequences);
        for id in old_ids {
            map.remove(id);
        }
        map.insert(new_id, Arc::new(new_seq));
        self.next_id = self.next_id.max(new_id + 1);
        self.generation += 1;
        Ok(())
    }

    /// Hand out an id no sequence in this pool has ever used.
    pub fn allocate_id(&mut self) -> SequenceId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Keep ids below `count` out of [`Self::allocate_id`], whether or not a
    /// sequence with that id was ever inserted.
    pub fn reserve_ids(&mut self, count: SequenceId) {
        self.next_id = self.next_id.max(count);
    }

    /// Read-only view of the current generation.
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            sequences: Arc::clone(&self.sequences),
            generation: self.generation,
        }
    }

    pub fn get(&self, id: SequenceId) -> Option<&Sequence> {
        self.sequences.get(&id).map(|seq| seq.as_ref())
    }

    pub fn size(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Number of mutations applied so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sequence> {
        self.sequences.values().map(|seq| seq.as_ref())
    }

    /// Consume the pool, returning the sequences in ascending id order.
    pub fn into_sequences(self) -> Vec<Sequence> {
        match Arc::try_unwrap(self.sequences) {
            Ok(map) => map
                .into_values()
                .map(|seq| Arc::try_unwrap(seq).unwrap_or_else(|shared| (*shared).clone()))
                .collect(),
            Err(shared) => shared.values().map(|seq| (**seq).clone()).collect(),
        }
    }
}

/// An immutable generation of the pool.
#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    sequences: Arc<Generation>,
    generation: u64,
}

impl PoolSnapshot {
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, id: SequenceId) -> Option<&Sequence> {
        self.sequences.get(&id).map(|seq| seq.as_ref())
    }

    /// Sequences in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Sequence> {
        self.sequences.values().map(|seq| seq.as_ref())
    }

    /// Sequences collected in ascending id order, for indexed access.
    pub fn to_vec(&self) -> Vec<&Sequence> {
        self.iter().collect()
    }
}
