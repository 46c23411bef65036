//! Run orchestration.
//!
//! Walks the target catalog in order; for each target, fetches the
//! reference window, extracts the expected primers, queries the reads
//! overlapping the target span, applies the primer filter, routes the
//! survivors through the realignment engine, and writes every routed read
//! to the output. One reader, one reference handle, and one writer serve
//! the whole run; per-target working data is discarded each iteration.
//!
//! A read overlapping several targets is processed once per target and may
//! be written more than once. That is observable, intended behavior.

use std::collections::HashSet;
use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use bstr::BString;
use noodles::core::{Position, Region};
use noodles::sam::alignment::io::Write as _;
use noodles::sam::alignment::RecordBuf;
use noodles::sam::header::record::value::{map, Map};
use noodles::{bam, fasta, sam};
use tracing::{debug, info, warn};

use crate::core::interval::GenomicInterval;
use crate::matching::primer::{self, PrimerPair};
use crate::realign::{GlobalAligner, NucAligner, Outcome, RealignError, RealignmentEngine};
use crate::targets::TargetCatalog;

pub const PROGRAM_NAME: &str = "amplicon-realigner";
pub const PROGRAM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Immutable run configuration, produced by the CLI layer.
#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub targets: PathBuf,
    pub output: PathBuf,
    pub reference: PathBuf,
    pub min_score: i32,
    pub primer_similarity: f64,
    pub gap_open: i32,
    pub gap_extend: i32,
    pub verbose: bool,
}

/// Whole-run counters, logged at completion.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunStats {
    pub targets: usize,
    pub candidates: u64,
    pub filtered_out: u64,
    pub passthrough: u64,
    pub realigned: u64,
    pub rejected: u64,
    pub written: u64,
}

impl RunStats {
    fn absorb(&mut self, target: &TargetStats) {
        self.candidates += target.candidates;
        self.filtered_out += target.filtered_out;
        self.passthrough += target.passthrough;
        self.realigned += target.realigned;
        self.rejected += target.rejected;
    }
}

/// Counters for a single target's batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct TargetStats {
    pub candidates: u64,
    pub filtered_out: u64,
    pub passthrough: u64,
    pub realigned: u64,
    pub rejected: u64,
}

/// Execute a full realignment run.
///
/// `invocation` is the command line recorded in the output header's `@PG`
/// record.
///
/// # Errors
///
/// Any unreadable input (targets, BAM, index, reference) or write failure
/// aborts the run. Per-read problems (primer length mismatch, low score)
/// are absorbed as rejections and never abort.
pub fn run(config: &Config, invocation: &str) -> anyhow::Result<RunStats> {
    info!("reading targets from {}", config.targets.display());
    let catalog = TargetCatalog::from_bed_path(&config.targets)
        .with_context(|| format!("could not read target file {}", config.targets.display()))?;
    info!("loaded {} targets", catalog.len());

    let mut reader = bam::io::indexed_reader::Builder::default()
        .build_from_path(&config.input)
        .with_context(|| format!("could not open alignment file {}", config.input.display()))?;
    let mut header = reader
        .read_header()
        .with_context(|| format!("could not read header of {}", config.input.display()))?;
    annotate_header(&mut header, invocation)?;

    let mut reference = fasta::io::indexed_reader::Builder::default()
        .build_from_path(&config.reference)
        .with_context(|| format!("could not open reference {}", config.reference.display()))?;

    let out_file = File::create(&config.output)
        .with_context(|| format!("could not create output file {}", config.output.display()))?;
    let mut writer = bam::io::Writer::new(out_file);
    writer.write_header(&header)?;

    let aligner = NucAligner::new(config.gap_open, config.gap_extend);
    let mut engine = RealignmentEngine::new(aligner, config.min_score);
    let mut stats = RunStats::default();

    info!("processing reads, writing to {}", config.output.display());
    for target in catalog.iter() {
        debug!("inspecting region {target}");

        let region = target_region(target)?;
        let window_record = reference
            .query(&region)
            .with_context(|| format!("could not fetch reference window for {target}"))?;
        let mut window = window_record.sequence().as_ref().to_vec();
        window.make_ascii_uppercase();
        anyhow::ensure!(
            window.len() as u64 == target.span(),
            "reference window for {} returned {} bases, expected {}",
            target,
            window.len(),
            target.span()
        );

        if window.iter().all(|base| *base == b'N') {
            warn!("reference window for {target} is entirely N, skipping target");
            continue;
        }

        debug!(
            "upstream primer {}, downstream primer {}",
            String::from_utf8_lossy(&window[..target.upstream_primer_len]),
            String::from_utf8_lossy(&window[window.len() - target.downstream_primer_len..]),
        );

        let mut records = Vec::new();
        let query = reader
            .query(&header, &region)
            .with_context(|| format!("could not query reads overlapping {target}"))?;
        for result in query {
            let record = result?;
            records.push(RecordBuf::try_from_alignment_record(&header, &record)?);
        }

        let (batch, target_stats) =
            process_target(records, target, &window, &mut engine, config.primer_similarity)?;
        stats.absorb(&target_stats);

        for record in &batch {
            writer.write_alignment_record(&header, record)?;
            stats.written += 1;
        }
        stats.targets += 1;
    }

    writer.try_finish().context("could not finalize output file")?;

    info!(
        "done: {} targets, {} candidate reads, {} filtered out, {} passthrough, {} realigned, {} rejected, {} written",
        stats.targets,
        stats.candidates,
        stats.filtered_out,
        stats.passthrough,
        stats.realigned,
        stats.rejected,
        stats.written
    );

    Ok(stats)
}

/// Route one target's batch of overlapping reads.
///
/// Pure with respect to I/O: takes the fetched records and reference
/// window, returns the records to write plus the batch counters. Unmapped,
/// secondary, and supplementary records are dropped, then the primer
/// filter runs, then the realignment engine. A read shorter than a primer
/// window is rejected with a warning rather than aborting the run.
///
/// # Errors
///
/// Propagates `RealignError` from the engine (invalid target coordinates).
pub fn process_target<A: GlobalAligner>(
    records: Vec<RecordBuf>,
    target: &GenomicInterval,
    reference_window: &[u8],
    engine: &mut RealignmentEngine<A>,
    primer_similarity: f64,
) -> Result<(Vec<RecordBuf>, TargetStats), RealignError> {
    let primers = PrimerPair::from_window(
        reference_window,
        target.upstream_primer_len,
        target.downstream_primer_len,
    );

    let mut out = Vec::with_capacity(records.len());
    let mut stats = TargetStats::default();

    for mut record in records {
        stats.candidates += 1;

        let flags = record.flags();
        if flags.is_unmapped() || flags.is_secondary() || flags.is_supplementary() {
            stats.filtered_out += 1;
            continue;
        }

        let read = record.sequence().as_ref().to_vec();
        match primer::passes_filter(&read, &primers, primer_similarity) {
            Ok(true) => {}
            Ok(false) => {
                stats.filtered_out += 1;
                continue;
            }
            Err(err) => {
                warn!("{target}: rejecting read, primer comparison failed: {err}");
                stats.filtered_out += 1;
                continue;
            }
        }

        match engine.process(&mut record, target, reference_window)? {
            Outcome::Passthrough => stats.passthrough += 1,
            Outcome::Realigned { score } => {
                debug!("{target}: realigned read with score {score}");
                stats.realigned += 1;
            }
            Outcome::Rejected { score } => {
                debug!("{target}: kept original alignment, score {score} below minimum");
                stats.rejected += 1;
            }
        }

        out.push(record);
    }

    Ok((out, stats))
}

fn target_region(target: &GenomicInterval) -> anyhow::Result<Region> {
    let start = usize::try_from(target.start)
        .ok()
        .and_then(|p| Position::try_from(p).ok())
        .with_context(|| format!("invalid start coordinate for {target}"))?;
    let end = usize::try_from(target.end)
        .ok()
        .and_then(|p| Position::try_from(p).ok())
        .with_context(|| format!("invalid end coordinate for {target}"))?;

    Ok(Region::new(target.contig.clone(), start..=end))
}

/// Mark the output header: sort order becomes `unsorted` and a `@PG`
/// record is appended with the tool name, version, and invoking command
/// line, chained to the previous program when one exists.
fn annotate_header(header: &mut sam::Header, invocation: &str) -> anyhow::Result<()> {
    let hd = Map::<map::Header>::builder()
        .insert(map::header::tag::SORT_ORDER, "unsorted")
        .build()?;
    *header.header_mut() = Some(hd);

    let previous = last_program_id(header);
    let id = unique_program_id(header, PROGRAM_NAME);

    let mut builder = Map::<map::Program>::builder()
        .insert(map::program::tag::NAME, PROGRAM_NAME)
        .insert(map::program::tag::VERSION, PROGRAM_VERSION)
        .insert(map::program::tag::COMMAND_LINE, invocation);
    if let Some(previous) = previous.as_deref() {
        builder = builder.insert(map::program::tag::PREVIOUS_PROGRAM_ID, previous);
    }

    header.programs_mut().add(BString::from(id), builder.build()?)?;

    Ok(())
}

/// The program at the end of the existing `@PG` chain: the one no other
/// program references as its predecessor.
fn last_program_id(header: &sam::Header) -> Option<String> {
    let programs = header.programs();
    let program_map = programs.as_ref();

    if program_map.is_empty() {
        return None;
    }

    let mut referenced: HashSet<&[u8]> = HashSet::new();
    for (_, pg) in program_map {
        if let Some(pp) = pg.other_fields().get(&map::program::tag::PREVIOUS_PROGRAM_ID) {
            referenced.insert(pp.as_ref());
        }
    }

    for (id, _) in program_map {
        if !referenced.contains(id.as_slice()) {
            return Some(String::from_utf8_lossy(id).to_string());
        }
    }

    program_map
        .keys()
        .next()
        .map(|id| String::from_utf8_lossy(id).to_string())
}

/// Append `.1`, `.2`, ... until the program ID is unused.
fn unique_program_id(header: &sam::Header, base: &str) -> String {
    let programs = header.programs();
    let existing = programs.as_ref();

    if !existing.contains_key(base.as_bytes()) {
        return base.to_string();
    }

    let mut suffix = 1u32;
    loop {
        let candidate = format!("{base}.{suffix}");
        if !existing.contains_key(candidate.as_bytes()) {
            return candidate;
        }
        suffix += 1;
    }
}
