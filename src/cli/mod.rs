//! Command-line interface for amplicon-realigner.
//!
//! A single-command tool: all options live on the top-level parser, and
//! the parsed arguments are handed to the pipeline as an immutable
//! [`Config`].
//!
//! ## Usage
//!
//! ```text
//! # Realign soft-clipped amplicon reads
//! amplicon-realigner -i sample.bam -t targets.bed -o realigned.bam -r ref.fa
//!
//! # Tighter primer matching and scoring
//! amplicon-realigner -i sample.bam -t targets.bed -o out.bam -r ref.fa \
//!     --primer-similarity 0.9 --min-score 80
//! ```
//!
//! The input BAM and the reference FASTA must be indexed (`.bai` / `.fai`
//! alongside).

use std::path::PathBuf;

use clap::Parser;

use crate::pipeline::Config;

#[derive(Parser)]
#[command(name = "amplicon-realigner")]
#[command(version)]
#[command(about = "Realign soft-clipped amplicon reads against their target windows")]
#[command(
    long_about = "amplicon-realigner corrects alignment artifacts in amplicon sequencing data.\n\nReads whose ends fall inside PCR primer sequences are often soft-clipped near the true amplicon boundary after whole-genome alignment. For each target in a BED file (with thick coordinates marking the insert), reads overlapping the target whose flanks match the expected primers are realigned end-to-end against the target's reference window; realignments that score above the minimum replace the original alignment."
)]
pub struct Cli {
    /// Path to input BAM file (indexed)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Path to BED file of amplicon targets with thick (insert) coordinates
    #[arg(short, long)]
    pub targets: PathBuf,

    /// Path to output BAM file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Path to indexed reference FASTA file
    #[arg(short, long)]
    pub reference: PathBuf,

    /// Minimum alignment score for accepting a realignment
    #[arg(short = 's', long, default_value_t = 50)]
    pub min_score: i32,

    /// Minimum per-primer similarity for a read to be considered
    #[arg(short = 'p', long, default_value_t = 0.8)]
    pub primer_similarity: f64,

    /// Read alignment gap open penalty
    #[arg(long, default_value_t = -14, allow_hyphen_values = true)]
    pub gap_open: i32,

    /// Read alignment gap extend penalty
    #[arg(long, default_value_t = -4, allow_hyphen_values = true)]
    pub gap_extend: i32,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Freeze the parsed arguments into the pipeline's run configuration.
    #[must_use]
    pub fn into_config(self) -> Config {
        Config {
            input: self.input,
            targets: self.targets,
            output: self.output,
            reference: self.reference,
            min_score: self.min_score,
            primer_similarity: self.primer_similarity,
            gap_open: self.gap_open,
            gap_extend: self.gap_extend,
            verbose: self.verbose,
        }
    }
}
