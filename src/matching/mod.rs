//! Primer similarity filtering.
//!
//! Reads are only worth realigning when both of their flanking windows look
//! like the target's PCR primers. This module scores those windows with a
//! Hamming-distance similarity fraction and applies a strict threshold on
//! both ends; everything else in the pipeline runs downstream of this
//! filter.

pub mod primer;

pub use primer::{hamming_distance, passes_filter, similarity, PrimerError, PrimerPair};
