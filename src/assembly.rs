//! Round-by-round assembly driver.
//!
//! Each round scans the pool once. A candidate that clears the current
//! floor is merged and the floor is kept, so the same quality level is
//! exhausted before it is relaxed. A round without a candidate lowers the
//! floor, or ends the run when the floor is already at its minimum.

use std::time::Instant;

use log::{debug, info};
use serde::Serialize;

use crate::config::{AssemblyConfig, ConfigError, Relaxation};
use crate::merge::{merge_candidate, MergeOutcome};
use crate::overlap::{find_best_overlap, OverlapCandidate, ScanOptions};
use crate::pool::{PoolError, PoolSnapshot, SequencePool};
use crate::read_source::{load_reads, RawRead, ReadError};
use crate::sequence::Sequence;
use crate::similarity::{SimilarityMode, FLOOR_EPSILON};

/// Errors that abort a run.
#[derive(thiserror::Error, Debug)]
pub enum AssemblyError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("pool consistency error in round {round}: {source}")]
    Pool {
        round: usize,
        #[source]
        source: PoolError,
    },
    #[cfg(feature = "parallel")]
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Non-increasing sequence of similarity floors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdSchedule {
    current: f64,
    minimum: f64,
    relaxation: Relaxation,
}

impl ThresholdSchedule {
    pub fn new(start: f64, minimum: f64, relaxation: Relaxation) -> Self {
        Self {
            current: start,
            minimum: minimum.min(start),
            relaxation,
        }
    }

    pub fn from_config(config: &AssemblyConfig) -> Self {
        Self::new(
            config.similarity_floor_start,
            config.similarity_floor_min,
            config.relaxation,
        )
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    /// True once no further relaxation is possible.
    pub fn exhausted(&self) -> bool {
        self.current <= self.minimum + FLOOR_EPSILON
    }

    /// Lower the floor; `None` if it is already at the minimum.
    pub fn relax(&mut self) -> Option<f64> {
        if self.exhausted() {
            return None;
        }
        self.current = self.relaxation.apply(self.current, self.minimum);
        Some(self.current)
    }
}

/// Controller state.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Scanning,
    Merging(OverlapCandidate),
    Relaxing,
    Done(Termination),
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// At most one sequence is left.
    Converged,
    /// No candidate clears even the minimum floor.
    FloorExhausted,
    /// `max_rounds` scans were made.
    RoundLimit,
    /// The configured deadline passed.
    Deadline,
}

/// A merge applied in a round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AcceptedMerge {
    pub candidate: OverlapCandidate,
    pub outcome: MergeOutcome,
}

/// What happened in one round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundTrace {
    pub round: usize,
    pub floor: f64,
    pub mode: SimilarityMode,
    pub accepted: Option<AcceptedMerge>,
    /// Pool size after the round.
    pub pool_size: usize,
}

/// Final contigs and the trace that produced them.
#[derive(Debug, Clone, Serialize)]
pub struct AssemblyReport {
    pub contigs: Vec<Sequence>,
    pub trace: Vec<RoundTrace>,
    pub termination: Termination,
    pub final_floor: f64,
    pub min_overlap_length: usize,
    pub max_overlap_length: usize,
}

impl AssemblyReport {
    /// True when the pool collapsed to a single contig (or was empty).
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }

    pub fn rounds(&self) -> usize {
        self.trace.len()
    }

    pub fn merges(&self) -> usize {
        self.trace.iter().filter(|round| round.accepted.is_some()).count()
    }

    /// Longest contig; ties go to the lowest id.
    pub fn longest_contig(&self) -> Option<&Sequence> {
        self.contigs
            .iter()
            .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| b.id().cmp(&a.id())))
    }
}

/// Load result plus the assembly of the accepted reads.
#[derive(Debug)]
pub struct Assembly {
    pub report: AssemblyReport,
    pub rejected: Vec<ReadError>,
}

/// Drives the scan / merge / relax loop over a pool.
pub struct Assembler {
    config: AssemblyConfig,
    #[cfg(feature = "parallel")]
    workers: Option<rayon::ThreadPool>,
}

impl Assembler {
    pub fn new(config: AssemblyConfig) -> Result<Self, AssemblyError> {
        config.validate()?;

        #[cfg(feature = "parallel")]
        let workers = if config.use_threads && config.max_workers > 0 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.max_workers)
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self {
            config,
            #[cfg(feature = "parallel")]
            workers,
        })
    }

    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Scan options for a run starting from `pool`.
    fn scan_options(&self, pool: &SequencePool) -> ScanOptions {
        let first_read_len = pool.iter().next().map(Sequence::len);
        let longest = pool.iter().map(Sequence::len).max().unwrap_or(0);
        ScanOptions {
            min_overlap_length: self.config.resolve_min_overlap(first_read_len),
            max_overlap_length: self.config.resolve_max_overlap(longest),
            use_prefix_index: self.config.use_prefix_index,
            use_threads: self.config.use_threads,
        }
    }

    fn scan(
        &self,
        snapshot: &PoolSnapshot,
        floor: f64,
        options: &ScanOptions,
    ) -> Option<OverlapCandidate> {
        #[cfg(feature = "parallel")]
        if let Some(workers) = &self.workers {
            return workers.install(|| find_best_overlap(snapshot, floor, options));
        }
        find_best_overlap(snapshot, floor, options)
    }

    /// Run to completion, consuming `pool`.
    pub fn assemble(&self, mut pool: SequencePool) -> Result<AssemblyReport, AssemblyError> {
        let options = self.scan_options(&pool);
        let mut schedule = ThresholdSchedule::from_config(&self.config);
        let deadline = self.config.deadline().map(|budget| Instant::now() + budget);
        let mut trace: Vec<RoundTrace> = Vec::new();
        let mut phase = Phase::Scanning;

        info!(
            "Assembling {} sequences (overlap {}..={}, floor {:.3} -> {:.3})",
            pool.size(),
            options.min_overlap_length,
            options.max_overlap_length,
            schedule.current(),
            self.config.similarity_floor_min
        );

        let termination = loop {
            phase = match phase {
                Phase::Scanning => {
                    if pool.size() <= 1 {
                        Phase::Done(Termination::Converged)
                    } else if deadline.is_some_and(|at| Instant::now() >= at) {
                        Phase::Done(Termination::Deadline)
                    } else if trace.len() >= self.config.max_rounds {
                        Phase::Done(Termination::RoundLimit)
                    } else {
                        let floor = schedule.current();
                        match self.scan(&pool.snapshot(), floor, &options) {
                            Some(candidate) => Phase::Merging(candidate),
                            None => {
                                let round = trace.len() + 1;
                                debug!(
                                    "Round {round}: no overlap clears floor {floor:.3} ({} sequences)",
                                    pool.size()
                                );
                                trace.push(RoundTrace {
                                    round,
                                    floor,
                                    mode: SimilarityMode::for_floor(floor),
                                    accepted: None,
                                    pool_size: pool.size(),
                                });
                                Phase::Relaxing
                            }
                        }
                    }
                }
                Phase::Merging(candidate) => {
                    let round = trace.len() + 1;
                    let floor = schedule.current();
                    let outcome = merge_candidate(&mut pool, &candidate)
                        .map_err(|source| AssemblyError::Pool { round, source })?;
                    debug!(
                        "Round {round}: merged {} + {} over {} symbols (score {:.3}) -> {} ({} sequences left)",
                        candidate.left,
                        candidate.right,
                        candidate.overlap_length,
                        candidate.score,
                        outcome.merged,
                        pool.size()
                    );
                    trace.push(RoundTrace {
                        round,
                        floor,
                        mode: SimilarityMode::for_floor(floor),
                        accepted: Some(AcceptedMerge { candidate, outcome }),
                        pool_size: pool.size(),
                    });
                    Phase::Scanning
                }
                Phase::Relaxing => match schedule.relax() {
                    Some(floor) => {
                        debug!("Relaxing similarity floor to {floor:.3}");
                        Phase::Scanning
                    }
                    None => Phase::Done(Termination::FloorExhausted),
                },
                Phase::Done(termination) => break termination,
            };
        };

        info!(
            "Assembly finished after {} rounds: {} contigs ({:?})",
            trace.len(),
            pool.size(),
            termination
        );

        Ok(AssemblyReport {
            contigs: pool.into_sequences(),
            trace,
            termination,
            final_floor: schedule.current(),
            min_overlap_length: options.min_overlap_length,
            max_overlap_length: options.max_overlap_length,
        })
    }
}

/// Validate `reads`, then assemble every accepted read.
pub fn assemble_reads<I>(reads: I, config: &AssemblyConfig) -> Result<Assembly, AssemblyError>
where
    I: IntoIterator<Item = RawRead>,
{
    let assembler = Assembler::new(config.clone())?;
    let loaded = load_reads(reads, &config.alphabet_symbols())
        .map_err(|source| AssemblyError::Pool { round: 0, source })?;
    let report = assembler.assemble(loaded.pool)?;
    Ok(Assembly {
        report,
        rejected: loaded.rejected,
    })
}
