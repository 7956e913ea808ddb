//! greedy_assembler library
//!
//! Greedy de-novo assembly of short reads: the pool of sequences is scanned
//! for the best suffix/prefix overlap, the winning pair is merged into a
//! consensus sequence, and the similarity floor is relaxed round by round
//! until no further merge clears it.

pub mod affix;
pub mod assembly;
pub mod config;
pub mod io;
pub mod merge;
pub mod overlap;
pub mod pool;
pub mod read_source;
pub mod sequence;
pub mod similarity;

pub use assembly::{
    assemble_reads, AcceptedMerge, Assembler, Assembly, AssemblyError, AssemblyReport, Phase,
    RoundTrace, Termination, ThresholdSchedule,
};
pub use config::{AssemblyConfig, ConfigError, Relaxation};
pub use merge::{consensus, merge_candidate, MergeOutcome};
pub use overlap::{find_best_overlap, Orientation, OverlapCandidate, ScanOptions};
pub use pool::{PoolError, PoolSnapshot, SequencePool};
pub use read_source::{load_reads, LoadReport, RawRead, ReadError};
pub use sequence::{Sequence, SequenceId};
pub use similarity::{evaluate, SimilarityMode, WindowScore};
