//! Core value types for amplicon targets.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`GenomicInterval`]: a genomic region with 1-based inclusive
//!   coordinates and primer-length metadata
//! - [`Strand`]: target orientation on the reference
//! - [`contig_position_cmp`]: the contig/position ordering used everywhere
//!   a catalog or base list is sorted
//! - [`merge_bases`]: collapse single-base intervals into contiguous windows

pub mod interval;

pub use interval::{contig_position_cmp, merge_bases, GenomicInterval, Strand};
