//! # amplicon-realigner
//!
//! A library for correcting alignment artifacts in amplicon-sequencing
//! reads.
//!
//! After whole-genome alignment, reads whose ends fall inside PCR primer
//! sequences are frequently soft-clipped near the true amplicon boundary.
//! This crate re-derives a corrected alignment for such reads using the
//! known amplicon target window and its primers: reads overlapping a
//! target whose flanks look like the target's primers are realigned
//! end-to-end against the target's reference window, and the new alignment
//! replaces the old one when it scores well enough.
//!
//! ## Pipeline
//!
//! 1. Parse and deduplicate amplicon targets into canonical intervals with
//!    primer-length metadata ([`targets`])
//! 2. Per target, fetch the reference window and the overlapping reads
//! 3. Keep mapped, primary reads whose flanking windows pass the primer
//!    similarity filter ([`matching`])
//! 4. Realign soft-clipped reads and accept or reject the result by
//!    alignment score ([`realign`])
//! 5. Write every routed read, unsorted, with an annotated header
//!    ([`pipeline`])
//!
//! ## Modules
//!
//! - [`core`]: genomic intervals, contig/position ordering, base merging
//! - [`targets`]: target record parsing and the deduplicated catalog
//! - [`matching`]: primer similarity scoring and filtering
//! - [`realign`]: edit scripts, the alignment capability, and the
//!   realignment decision engine
//! - [`pipeline`]: run orchestration and per-target routing
//! - [`cli`]: command-line interface implementation

pub mod cli;
pub mod core;
pub mod matching;
pub mod pipeline;
pub mod realign;
pub mod targets;

// Re-export commonly used types for convenience
pub use crate::core::interval::{contig_position_cmp, merge_bases, GenomicInterval, Strand};
pub use matching::primer::{PrimerError, PrimerPair};
pub use pipeline::{Config, RunStats};
pub use realign::{
    AlignmentResult, EditOp, EditScript, GlobalAligner, NucAligner, Outcome, RealignmentEngine,
};
pub use targets::{TargetCatalog, TargetError};
