//! End-to-end assembly scenarios and round-level invariants.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use greedy_assembler::{
    assemble_reads, find_best_overlap, load_reads, merge_candidate, AssemblyConfig,
    AssemblyReport, RawRead, ReadError, ScanOptions, SequenceId, Termination,
};

fn raw(seqs: &[&str]) -> Vec<RawRead> {
    seqs.iter().map(|s| RawRead::from(*s)).collect()
}

fn config(min_overlap_length: usize) -> AssemblyConfig {
    AssemblyConfig {
        min_overlap_length,
        ..Default::default()
    }
}

fn random_genome(rng: &mut StdRng, len: usize) -> String {
    let bases = b"ACGT";
    (0..len).map(|_| bases[rng.gen_range(0..4)] as char).collect()
}

/// Tile `genome` with reads of `read_len` starting every `step` symbols.
fn tile(genome: &str, read_len: usize, step: usize) -> Vec<String> {
    (0..=genome.len() - read_len)
        .step_by(step)
        .map(|start| genome[start..start + read_len].to_string())
        .collect()
}

fn assert_round_invariants(report: &AssemblyReport, initial_size: usize) {
    let mut previous_size = initial_size;
    let mut previous_floor = f64::INFINITY;
    for round in &report.trace {
        assert!(round.floor <= previous_floor, "floor rose in round {}", round.round);
        match round.accepted {
            Some(_) => assert_eq!(round.pool_size + 1, previous_size),
            None => assert_eq!(round.pool_size, previous_size),
        }
        previous_size = round.pool_size;
        previous_floor = round.floor;
    }
    assert_eq!(previous_size, report.contigs.len());
}

fn assert_origins_partition(report: &AssemblyReport, accepted: &BTreeSet<SequenceId>) {
    let mut seen = BTreeSet::new();
    let mut total = 0;
    for contig in &report.contigs {
        total += contig.origin().len();
        seen.extend(contig.origin().iter().copied());
    }
    assert_eq!(total, accepted.len(), "a read was duplicated or lost");
    assert_eq!(&seen, accepted);
}

#[test]
fn scenario_a_exact_pair_merges_in_round_one() {
    let assembly = assemble_reads(raw(&["AAAATTTT", "TTTTCCCC"]), &config(4)).unwrap();
    let report = assembly.report;
    assert!(report.converged());
    assert_eq!(report.contigs.len(), 1);
    assert_eq!(report.contigs[0].content(), "AAAATTTTCCCC");
    assert_eq!(report.trace.len(), 1);
    assert_eq!(report.trace[0].round, 1);
    assert_eq!(report.trace[0].floor, 1.0);
    assert!(report.trace[0].accepted.is_some());
}

#[test]
fn scenario_b_unrelated_reads_stay_fragmented() {
    let report = assemble_reads(raw(&["ACGTACGT", "GGGGGGGG"]), &config(3))
        .unwrap()
        .report;
    assert!(!report.converged());
    assert_eq!(report.termination, Termination::FloorExhausted);
    assert_eq!(report.contigs.len(), 2);
    assert!(report.trace.iter().all(|round| round.accepted.is_none()));
    assert!((report.final_floor - 0.8).abs() < 1e-9);
    assert_round_invariants(&report, 2);
}

#[test]
fn scenario_c_invalid_symbol_rejects_only_that_read() {
    let assembly =
        assemble_reads(raw(&["AAAATTTT", "GGNNCCAA", "TTTTCCCC"]), &config(4)).unwrap();
    assert_eq!(assembly.rejected.len(), 1);
    assert!(matches!(
        assembly.rejected[0],
        ReadError::InvalidAlphabet {
            read: 1,
            symbol: 'N',
            position: 2,
            ..
        }
    ));

    let report = assembly.report;
    assert!(report.converged());
    assert_eq!(report.contigs[0].content(), "AAAATTTTCCCC");
    assert_eq!(report.contigs[0].origin(), &BTreeSet::from([0, 2]));
}

#[test]
fn merged_contig_does_not_take_a_rejected_read_id() {
    let assembly = assemble_reads(raw(&["AAAATTTT", "TTTTCCCC", "NNNN"]), &config(4)).unwrap();
    let rejected: Vec<SequenceId> = assembly.rejected.iter().map(ReadError::read).collect();
    assert_eq!(rejected, vec![2]);

    let contigs = &assembly.report.contigs;
    assert_eq!(contigs.len(), 1);
    assert_eq!(contigs[0].content(), "AAAATTTTCCCC");
    assert_eq!(contigs[0].id(), 3);
}

#[test]
fn scenario_d_chain_merges_in_any_order() {
    let chain = ["ACGTTGCA", "TGCAATCC", "ATCCGGTA"];
    let orders: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    for order in orders {
        let reads: Vec<&str> = order.iter().map(|&idx| chain[idx]).collect();
        let report = assemble_reads(raw(&reads), &config(4)).unwrap().report;
        assert!(report.converged(), "order {order:?}");
        assert_eq!(report.merges(), 2, "order {order:?}");
        assert_eq!(report.contigs[0].content(), "ACGTTGCAATCCGGTA", "order {order:?}");
        assert_eq!(report.contigs[0].origin(), &BTreeSet::from([0, 1, 2]));
    }
}

#[test]
fn tiled_genome_is_reconstructed_from_shuffled_reads() {
    let mut rng = StdRng::seed_from_u64(42);
    let genome = random_genome(&mut rng, 295);
    let mut reads = tile(&genome, 40, 15);
    reads.shuffle(&mut rng);

    let input: Vec<RawRead> = reads.iter().map(|r| RawRead::from(r.as_str())).collect();
    let report = assemble_reads(input, &config(20)).unwrap().report;
    assert!(report.converged());
    assert_eq!(report.contigs[0].content(), genome);
    assert_round_invariants(&report, reads.len());
}

#[test]
fn noisy_reads_keep_invariants_and_are_deterministic() {
    let mut rng = StdRng::seed_from_u64(7);
    let genome = random_genome(&mut rng, 400);
    let mut reads = tile(&genome, 50, 20);
    for read in reads.iter_mut().step_by(3) {
        let pos = rng.gen_range(0..read.len());
        let replacement = if &read[pos..pos + 1] == "A" { "C" } else { "A" };
        read.replace_range(pos..pos + 1, replacement);
    }
    reads.shuffle(&mut rng);
    let input: Vec<RawRead> = reads.iter().map(|r| RawRead::from(r.as_str())).collect();
    let cfg = AssemblyConfig {
        min_overlap_length: 15,
        similarity_floor_min: 0.85,
        ..Default::default()
    };

    let first = assemble_reads(input.clone(), &cfg).unwrap().report;
    let second = assemble_reads(input, &cfg).unwrap().report;
    assert_eq!(first.contigs, second.contigs);
    assert_eq!(first.trace, second.trace);
    assert_eq!(first.termination, second.termination);

    assert_round_invariants(&first, reads.len());
    let accepted: BTreeSet<SequenceId> = (0..reads.len()).collect();
    assert_origins_partition(&first, &accepted);
}

#[test]
fn origins_are_conserved_after_every_merge() {
    let mut rng = StdRng::seed_from_u64(1234);
    let genome = random_genome(&mut rng, 200);
    let mut reads = tile(&genome, 30, 10);
    reads.shuffle(&mut rng);
    let input: Vec<RawRead> = reads.iter().map(|r| RawRead::from(r.as_str())).collect();

    let mut pool = load_reads(input, b"ACGT").unwrap().pool;
    let expected: Vec<SequenceId> = (0..reads.len()).collect();
    let options = ScanOptions {
        min_overlap_length: 10,
        ..Default::default()
    };

    while let Some(candidate) = find_best_overlap(&pool.snapshot(), 1.0, &options) {
        let before = pool.size();
        merge_candidate(&mut pool, &candidate).unwrap();
        assert_eq!(pool.size() + 1, before);

        let mut referenced: Vec<SequenceId> = pool
            .iter()
            .flat_map(|seq| seq.origin().iter().copied())
            .collect();
        referenced.sort_unstable();
        assert_eq!(referenced, expected);
    }
    assert_eq!(pool.size(), 1);
}

#[test]
fn unproductive_scan_leaves_pool_untouched() {
    let pool = load_reads(raw(&["ACGTACGT", "GGGGGGGG"]), b"ACGT")
        .unwrap()
        .pool;
    let generation = pool.generation();
    let snapshot = pool.snapshot();
    assert!(find_best_overlap(&snapshot, 1.0, &ScanOptions::default()).is_none());
    assert_eq!(pool.generation(), generation);
    assert_eq!(pool.size(), 2);
}

#[test]
fn round_limit_reports_partial_pool() {
    let mut rng = StdRng::seed_from_u64(99);
    let genome = random_genome(&mut rng, 200);
    let reads = tile(&genome, 30, 10);
    let input: Vec<RawRead> = reads.iter().map(|r| RawRead::from(r.as_str())).collect();
    let cfg = AssemblyConfig {
        min_overlap_length: 10,
        max_rounds: 3,
        ..Default::default()
    };

    let report = assemble_reads(input, &cfg).unwrap().report;
    assert_eq!(report.termination, Termination::RoundLimit);
    assert_eq!(report.rounds(), 3);
    assert_eq!(report.contigs.len(), reads.len() - 3);
}
