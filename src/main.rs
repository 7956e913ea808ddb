use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bio::alignment::distance::levenshtein;
use clap::Parser;
use log::{info, warn};
use serde_json::json;

use greedy_assembler::io::{read_records, write_contigs, write_super_sequence};
use greedy_assembler::{assemble_reads, AssemblyConfig, AssemblyReport, Relaxation};

/// Greedy overlap assembler with a relaxing similarity floor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// FASTA/FASTQ/plain-line read file (optionally .gz)
    reads: PathBuf,

    /// JSON configuration file; command-line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output FASTA path for the contigs (default: stdout)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Write all contigs as one concatenated `super_sequence` record
    #[arg(long)]
    concatenate: bool,

    /// Minimum overlap length
    #[arg(long)]
    min_overlap: Option<usize>,

    /// Maximum overlap length (default: longest read)
    #[arg(long)]
    max_overlap: Option<usize>,

    /// Minimum overlap as a fraction of the first read's length
    #[arg(long)]
    min_overlap_fraction: Option<f64>,

    /// Similarity floor of the first round (1.0 = exact)
    #[arg(long, short = 's')]
    score: Option<f64>,

    /// Lowest similarity floor the relaxation may reach
    #[arg(long)]
    min_score: Option<f64>,

    /// Lower the floor by this amount after an unproductive round
    #[arg(long, conflicts_with = "relax_factor")]
    relax_step: Option<f64>,

    /// Multiply the floor by this factor after an unproductive round
    #[arg(long)]
    relax_factor: Option<f64>,

    /// Hard cap on the number of rounds
    #[arg(long)]
    max_rounds: Option<usize>,

    /// Stop after this many seconds and report the current pool
    #[arg(long)]
    deadline_secs: Option<f64>,

    /// Accepted read symbols
    #[arg(long)]
    alphabet: Option<String>,

    /// Enable threaded overlap scanning (default: off)
    #[arg(long, default_value_t = false)]
    threads: bool,

    /// Number of worker threads for the overlap scan (default: max available - 1)
    #[arg(long, default_value_t = num_cpus::get().saturating_sub(1))]
    max_workers: usize,

    /// Scan exact rounds exhaustively instead of through the prefix index
    #[arg(long)]
    no_prefix_index: bool,

    /// Optional JSON file receiving the per-round trace
    #[arg(long)]
    trace_json: Option<PathBuf>,

    /// Optional reference FASTA compared against the longest contig
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Wrap FASTA lines to this width (0 = no-wrap)
    #[arg(long, default_value_t = 60)]
    fasta_line_width: usize,

    /// Verbose/info output (default: quiet)
    #[arg(long, short = 'v', alias = "info")]
    verbose: bool,

    /// Debug output
    #[arg(long, short = 'd', alias = "dbg")]
    debug: bool,

    /// Trace output
    #[arg(long)]
    trace: bool,
}

impl Args {
    fn assembly_config(&self) -> Result<AssemblyConfig> {
        let mut config = match &self.config {
            Some(path) => AssemblyConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => AssemblyConfig::default(),
        };

        if let Some(value) = self.min_overlap {
            config.min_overlap_length = value;
        }
        if self.max_overlap.is_some() {
            config.max_overlap_length = self.max_overlap;
        }
        if self.min_overlap_fraction.is_some() {
            config.min_overlap_fraction = self.min_overlap_fraction;
        }
        if let Some(value) = self.score {
            config.similarity_floor_start = value;
        }
        if let Some(value) = self.min_score {
            config.similarity_floor_min = value;
        }
        if let Some(step) = self.relax_step {
            config.relaxation = Relaxation::Step(step);
        }
        if let Some(factor) = self.relax_factor {
            config.relaxation = Relaxation::Factor(factor);
        }
        if let Some(value) = self.max_rounds {
            config.max_rounds = value;
        }
        if self.deadline_secs.is_some() {
            config.deadline_secs = self.deadline_secs;
        }
        if let Some(alphabet) = &self.alphabet {
            config.alphabet = alphabet.clone();
        }
        if self.threads {
            config.use_threads = true;
            config.max_workers = self.max_workers;
        }
        if self.no_prefix_index {
            config.use_prefix_index = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() {
    let args = Args::parse();
    let log_level = if args.trace {
        log::LevelFilter::Trace
    } else if args.debug {
        log::LevelFilter::Debug
    } else if args.verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Error
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Err(error) = run(&args) {
        eprintln!("Assembly failed: {error:?}");
        std::process::exit(1);
    }
}

fn create_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}

fn run(args: &Args) -> Result<AssemblyReport> {
    let config = args.assembly_config()?;
    info!("reads: {}", args.reads.display());

    let raw = read_records(&args.reads)
        .with_context(|| format!("Failed to parse reads from {}", args.reads.display()))?;
    if raw.is_empty() {
        bail!("No reads found in {}", args.reads.display());
    }

    let assembly = assemble_reads(raw, &config)?;
    if !assembly.rejected.is_empty() {
        warn!(
            "{} reads rejected during loading; first: {}",
            assembly.rejected.len(),
            assembly.rejected[0]
        );
    }
    let report = assembly.report;

    if report.converged() {
        info!("Converged to a single contig in {} rounds", report.rounds());
    } else {
        info!(
            "No convergence ({:?}): {} contigs after {} rounds, final floor {:.3}",
            report.termination,
            report.contigs.len(),
            report.rounds(),
            report.final_floor
        );
    }

    write_output(args, &report)?;

    if let Some(path) = &args.trace_json {
        create_parent_dirs(path)?;
        let output = json!({
            "termination": report.termination,
            "converged": report.converged(),
            "final_floor": report.final_floor,
            "min_overlap_length": report.min_overlap_length,
            "max_overlap_length": report.max_overlap_length,
            "rejected": assembly.rejected.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
            "rounds": report.trace,
        });
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        writeln!(file, "{}", serde_json::to_string_pretty(&output)?)?;
        info!("Round trace written to {}", path.display());
    }

    if let Some(path) = &args.reference {
        check_reference(path, &report)?;
    }

    Ok(report)
}

fn write_output(args: &Args, report: &AssemblyReport) -> Result<()> {
    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => {
            create_parent_dirs(path)?;
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    if args.concatenate {
        write_super_sequence(&mut out, &report.contigs, args.fasta_line_width)?;
    } else {
        write_contigs(&mut out, &report.contigs, args.fasta_line_width)?;
    }
    out.flush()?;
    Ok(())
}

fn check_reference(path: &Path, report: &AssemblyReport) -> Result<()> {
    const MAX_DISTANCE_LEN: usize = 20_000;

    let reference: String = read_records(path)
        .with_context(|| format!("Failed to parse reference {}", path.display()))?
        .into_iter()
        .map(|record| record.sequence.to_ascii_uppercase())
        .collect();
    let Some(contig) = report.longest_contig() else {
        info!("Reference check skipped: no contigs");
        return Ok(());
    };
    let assembled = contig.content();

    if assembled == reference {
        info!(
            "Longest contig matches the reference sequence exactly ({} bp).",
            assembled.len()
        );
    } else if assembled.len() <= MAX_DISTANCE_LEN && reference.len() <= MAX_DISTANCE_LEN {
        let distance = levenshtein(assembled.as_bytes(), reference.as_bytes());
        info!(
            "Edit distance to reference (len {} vs {}): {}",
            assembled.len(),
            reference.len(),
            distance
        );
    } else {
        info!(
            "Reference check skipped: contig length {} or reference length {} exceeds {} bp threshold.",
            assembled.len(),
            reference.len(),
            MAX_DISTANCE_LEN
        );
    }
    Ok(())
}

#[cfg(test)]
mod smoke {
    use super::*;

    fn args_for(reads: &Path, output: &Path) -> Args {
        Args::parse_from([
            "greedy_assembler",
            reads.to_str().unwrap(),
            "--min-overlap",
            "4",
            "--output",
            output.to_str().unwrap(),
        ])
    }

    #[test]
    fn smoke_run() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let reads = dir.path().join("reads.txt");
        std::fs::write(&reads, "AAAATTTT\nTTTTCCCC\n").unwrap();
        let output = dir.path().join("out/contigs.fasta");

        let report = run(&args_for(&reads, &output)).expect("run");
        assert!(report.converged());
        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written, ">contig_0 id=2 reads=2 len=12\nAAAATTTTCCCC\n");
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let config = dir.path().join("config.json");
        std::fs::write(&config, r#"{"min_overlap_length": 9, "max_rounds": 3}"#).unwrap();

        let args = Args::parse_from([
            "greedy_assembler",
            "reads.fa",
            "--config",
            config.to_str().unwrap(),
            "--min-overlap",
            "5",
            "--relax-factor",
            "0.8",
        ]);
        let config = args.assembly_config().expect("config");
        assert_eq!(config.min_overlap_length, 5);
        assert_eq!(config.max_rounds, 3);
        assert_eq!(config.relaxation, Relaxation::Factor(0.8));
    }

    #[test]
    fn empty_input_fails() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let reads = dir.path().join("reads.txt");
        std::fs::write(&reads, "\n").unwrap();
        let output = dir.path().join("contigs.fasta");
        assert!(run(&args_for(&reads, &output)).is_err());
    }
}
