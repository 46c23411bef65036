//! Amplicon target catalog.
//!
//! Parses tab-separated target records (BED with thick coordinates marking
//! the insert), derives primer lengths from the thin/thick offsets,
//! deduplicates targets that share coordinates, and exposes the result as a
//! sequence ordered by contig and position.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use crate::core::interval::{contig_position_cmp, GenomicInterval, Strand};

/// Field indices required in every non-blank target record.
const REQUIRED_FIELDS: [usize; 6] = [0, 1, 2, 3, 6, 7];

#[derive(Error, Debug)]
pub enum TargetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: missing required field {index}")]
    MissingField { line: usize, index: usize },

    #[error("Line {line}: expected an integer for {field}, got '{value}'")]
    InvalidInteger {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error(
        "Line {line}: primer lengths {upstream}+{downstream} do not fit interval of {span} bases"
    )]
    InvalidPrimerSpan {
        line: usize,
        upstream: i64,
        downstream: i64,
        span: u64,
    },
}

/// Value-typed coordinate key used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TargetKey {
    contig: String,
    start: u64,
    end: u64,
}

/// Deduplicated amplicon targets in contig/position order.
///
/// Built once from a target file; read-only afterwards.
#[derive(Debug)]
pub struct TargetCatalog {
    targets: Vec<GenomicInterval>,
}

impl TargetCatalog {
    /// Read and parse a target file.
    ///
    /// # Errors
    ///
    /// Returns `TargetError::Io` if the file cannot be read, or a parse
    /// error for the first malformed record. Any malformed record is fatal
    /// for the run.
    pub fn from_bed_path(path: &Path) -> Result<Self, TargetError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_bed_text(&text)
    }

    /// Parse tab-separated target records.
    ///
    /// Fields per record: contig, start (0-based), end, name, score,
    /// strand, thick start (0-based), thick end. Indices 0, 1, 2, 3, 6 and
    /// 7 are required; blank lines are skipped. Starts are converted to
    /// 1-based. Primer lengths are the distances between the thin and
    /// thick bounds on each side.
    ///
    /// Records with identical (contig, start, end) merge: primer lengths
    /// take the pairwise max and names join with `_` in encounter order.
    ///
    /// # Errors
    ///
    /// Returns an error for a missing required field, a non-integer
    /// coordinate, or primer lengths that do not fit the interval. Line
    /// numbers in errors are 1-based.
    pub fn from_bed_text(text: &str) -> Result<Self, TargetError> {
        let mut amplicons: HashMap<TargetKey, GenomicInterval> = HashMap::new();

        for (i, line) in text.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let line_num = i + 1;

            let fields: Vec<&str> = line.split('\t').collect();
            for &index in &REQUIRED_FIELDS {
                if fields.get(index).is_none() {
                    return Err(TargetError::MissingField { line: line_num, index });
                }
            }

            let contig = fields[0].to_string();
            let start = parse_coord(fields[1], "start", line_num)? + 1;
            let end = parse_coord(fields[2], "end", line_num)?;
            let name = fields[3].to_string();
            let thick_start = parse_coord(fields[6], "thick start", line_num)? + 1;
            let thick_end = parse_coord(fields[7], "thick end", line_num)?;

            let upstream = thick_start - start;
            let downstream = end - thick_end;
            let span = end - start + 1;
            if span <= 0 || upstream < 0 || downstream < 0 || upstream + downstream > span {
                return Err(TargetError::InvalidPrimerSpan {
                    line: line_num,
                    upstream,
                    downstream,
                    span: span.max(0).unsigned_abs(),
                });
            }

            let mut target =
                GenomicInterval::with_name(contig.clone(), start.unsigned_abs(), end.unsigned_abs(), name);
            target.strand = fields.get(5).and_then(|s| Strand::parse(s));
            target.upstream_primer_len = upstream.unsigned_abs() as usize;
            target.downstream_primer_len = downstream.unsigned_abs() as usize;

            let key = TargetKey {
                contig,
                start: target.start,
                end: target.end,
            };

            match amplicons.get_mut(&key) {
                Some(existing) => merge_into(existing, &target),
                None => {
                    amplicons.insert(key, target);
                }
            }
        }

        let mut targets: Vec<GenomicInterval> = amplicons.into_values().collect();
        targets.sort_by(contig_position_cmp);

        Ok(Self { targets })
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenomicInterval> {
        self.targets.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Fold a same-coordinate record into an existing catalog entry: keep the
/// longest primer on each side and `_`-join the names in encounter order.
fn merge_into(existing: &mut GenomicInterval, incoming: &GenomicInterval) {
    existing.upstream_primer_len = existing.upstream_primer_len.max(incoming.upstream_primer_len);
    existing.downstream_primer_len =
        existing.downstream_primer_len.max(incoming.downstream_primer_len);
    existing.name = format!("{}_{}", existing.name, incoming.name);
}

fn parse_coord(value: &str, field: &'static str, line: usize) -> Result<i64, TargetError> {
    value.parse::<i64>().map_err(|_| TargetError::InvalidInteger {
        line,
        field,
        value: value.to_string(),
    })
}
