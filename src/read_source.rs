//! Raw read intake: validation against the alphabet and pool construction.
//!
//! Bad reads are rejected one by one and reported together; they never stop
//! the rest of the batch from loading.

use std::collections::BTreeMap;

use bio::alphabets::Alphabet;

use crate::pool::{PoolError, SequencePool};
use crate::sequence::{Sequence, SequenceId};

/// One input record as handed over by a loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRead {
    /// Record name from the input file, if any.
    pub name: Option<String>,
    pub sequence: String,
}

impl RawRead {
    pub fn new(name: Option<String>, sequence: impl Into<String>) -> Self {
        Self {
            name,
            sequence: sequence.into(),
        }
    }

    pub fn unnamed(sequence: impl Into<String>) -> Self {
        Self::new(None, sequence)
    }
}

impl From<&str> for RawRead {
    fn from(sequence: &str) -> Self {
        Self::unnamed(sequence)
    }
}

/// Per-read rejection reasons.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error("read {read} ({}) contains symbol {symbol:?} at position {position}, outside the alphabet", display_name(.name))]
    InvalidAlphabet {
        read: SequenceId,
        name: Option<String>,
        symbol: char,
        position: usize,
    },
    #[error("read {read} ({}) is empty", display_name(.name))]
    EmptyRead {
        read: SequenceId,
        name: Option<String>,
    },
}

fn display_name(name: &Option<String>) -> &str {
    name.as_deref().unwrap_or("unnamed")
}

impl ReadError {
    /// Id the rejected read would have had.
    pub fn read(&self) -> SequenceId {
        match self {
            Self::InvalidAlphabet { read, .. } | Self::EmptyRead { read, .. } => *read,
        }
    }
}

/// Result of loading a batch of reads.
#[derive(Debug)]
pub struct LoadReport {
    pub pool: SequencePool,
    pub rejected: Vec<ReadError>,
    /// Names of the accepted reads, by id.
    pub names: BTreeMap<SequenceId, String>,
}

impl LoadReport {
    pub fn accepted(&self) -> usize {
        self.pool.size()
    }
}

/// Validate a single read, returning its upper-cased content.
pub fn validate_read(
    read: SequenceId,
    raw: &RawRead,
    alphabet: &Alphabet,
) -> Result<String, ReadError> {
    let upper = raw.sequence.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return Err(ReadError::EmptyRead {
            read,
            name: raw.name.clone(),
        });
    }
    if let Some((position, symbol)) = upper
        .char_indices()
        .find(|&(_, symbol)| !symbol.is_ascii() || !alphabet.is_word([symbol as u8]))
    {
        return Err(ReadError::InvalidAlphabet {
            read,
            name: raw.name.clone(),
            symbol,
            position,
        });
    }
    Ok(upper)
}

/// Build the initial pool. Read `i` gets id `i` whether or not it is accepted,
/// so rejections keep pointing at the original input position.
pub fn load_reads<I>(reads: I, alphabet_symbols: &[u8]) -> Result<LoadReport, PoolError>
where
    I: IntoIterator<Item = RawRead>,
{
    let alphabet = Alphabet::new(alphabet_symbols.iter().map(|b| b.to_ascii_uppercase()));
    let mut pool = SequencePool::new();
    let mut rejected = Vec::new();
    let mut names = BTreeMap::new();
    let mut total = 0;

    for (read, raw) in reads.into_iter().enumerate() {
        total = read + 1;
        match validate_read(read, &raw, &alphabet) {
            Ok(content) => {
                pool.insert(Sequence::from_read(read, content))?;
                if let Some(name) = raw.name {
                    names.insert(read, name);
                }
            }
            Err(error) => {
                log::warn!("Rejected {error}");
                rejected.push(error);
            }
        }
    }
    pool.reserve_ids(total);

    log::info!(
        "Loaded {} reads ({} rejected)",
        pool.size(),
        rejected.len()
    );
    Ok(LoadReport {
        pool,
        rejected,
        names,
    })
}
