//! Assembly configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default minimum overlap length, matching the shortest affix the overlap
/// index is worth building for.
pub const DEFAULT_MIN_OVERLAP_LEN: usize = 3;

/// Default alphabet: unambiguous nucleotide codes.
pub const DEFAULT_ALPHABET: &str = "ACGT";

/// Errors raised by [`AssemblyConfig::validate`] and config loading.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// How the similarity floor is lowered after an unproductive scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relaxation {
    /// Subtract a fixed amount.
    Step(f64),
    /// Multiply by a factor in `(0, 1)`.
    Factor(f64),
}

impl Relaxation {
    /// Next floor, never below `minimum`.
    pub fn apply(self, floor: f64, minimum: f64) -> f64 {
        let next = match self {
            Self::Step(step) => floor - step,
            Self::Factor(factor) => floor * factor,
        };
        next.max(minimum)
    }
}

impl Default for Relaxation {
    fn default() -> Self {
        Self::Step(0.05)
    }
}

/// Options that govern a full assembly run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Shortest overlap ever accepted.
    pub min_overlap_length: usize,
    /// Longest overlap searched; `None` means the longest read.
    pub max_overlap_length: Option<usize>,
    /// If set, the minimum overlap becomes at least this fraction of the
    /// first read's length.
    pub min_overlap_fraction: Option<f64>,
    /// Floor used by the first round; 1.0 demands exact matches.
    pub similarity_floor_start: f64,
    /// Relaxation stops once the floor reaches this value.
    pub similarity_floor_min: f64,
    pub relaxation: Relaxation,
    /// Hard cap on the number of scans.
    pub max_rounds: usize,
    /// Optional wall-clock budget for the whole run, in seconds.
    pub deadline_secs: Option<f64>,
    /// Symbols a read may contain (case-insensitive, ASCII).
    pub alphabet: String,
    /// Prune exact rounds through the prefix index.
    pub use_prefix_index: bool,
    /// Shard the overlap scan across threads.
    pub use_threads: bool,
    /// Worker count for the threaded scan; 0 uses rayon's global pool.
    pub max_workers: usize,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            min_overlap_length: DEFAULT_MIN_OVERLAP_LEN,
            max_overlap_length: None,
            min_overlap_fraction: None,
            similarity_floor_start: 1.0,
            similarity_floor_min: 0.8,
            relaxation: Relaxation::default(),
            max_rounds: 10_000,
            deadline_secs: None,
            alphabet: DEFAULT_ALPHABET.to_string(),
            use_prefix_index: true,
            use_threads: false,
            max_workers: 0,
        }
    }
}

impl AssemblyConfig {
    /// Load a JSON configuration; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.min_overlap_length == 0 {
            return invalid("min_overlap_length must be at least 1".into());
        }
        if let Some(max) = self.max_overlap_length {
            if max < self.min_overlap_length {
                return invalid(format!(
                    "max_overlap_length ({max}) is below min_overlap_length ({})",
                    self.min_overlap_length
                ));
            }
        }
        if let Some(fraction) = self.min_overlap_fraction {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return invalid(format!("min_overlap_fraction must be in (0, 1], got {fraction}"));
            }
        }
        let (start, min) = (self.similarity_floor_start, self.similarity_floor_min);
        if !(0.0..=1.0).contains(&start) || !(0.0..=1.0).contains(&min) {
            return invalid(format!(
                "similarity floors must lie in [0, 1] (start {start}, min {min})"
            ));
        }
        if min > start {
            return invalid(format!(
                "similarity_floor_min ({min}) is above similarity_floor_start ({start})"
            ));
        }
        match self.relaxation {
            Relaxation::Step(step) if !(step > 0.0) => {
                return invalid(format!("relaxation step must be positive, got {step}"));
            }
            Relaxation::Factor(factor) if !(factor > 0.0 && factor < 1.0) => {
                return invalid(format!("relaxation factor must be in (0, 1), got {factor}"));
            }
            _ => {}
        }
        if self.max_rounds == 0 {
            return invalid("max_rounds must be at least 1".into());
        }
        if let Some(secs) = self.deadline_secs {
            if !(secs > 0.0) || !secs.is_finite() {
                return invalid(format!("deadline_secs must be positive, got {secs}"));
            }
        }
        if self.alphabet.is_empty() || !self.alphabet.is_ascii() {
            return invalid(format!(
                "alphabet must be a non-empty ASCII string, got {:?}",
                self.alphabet
            ));
        }
        Ok(())
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs_f64)
    }

    /// Upper-cased alphabet symbols.
    pub fn alphabet_symbols(&self) -> Vec<u8> {
        self.alphabet.bytes().map(|b| b.to_ascii_uppercase()).collect()
    }

    /// Effective minimum overlap once `min_overlap_fraction` is applied.
    pub fn resolve_min_overlap(&self, first_read_len: Option<usize>) -> usize {
        match (self.min_overlap_fraction, first_read_len) {
            (Some(fraction), Some(len)) => {
                let scaled = (fraction * len as f64).ceil() as usize;
                self.min_overlap_length.max(scaled)
            }
            _ => self.min_overlap_length,
        }
    }

    /// Effective maximum overlap; defaults to the longest read.
    pub fn resolve_max_overlap(&self, longest_read: usize) -> usize {
        self.max_overlap_length.unwrap_or(longest_read)
    }
}
