use noodles::sam::alignment::record::cigar::op::{Kind, Op};
use noodles::sam::alignment::record_buf::Cigar;

use crate::realign::aligner::GAP;

/// A single edit-script operation.
///
/// `Match` covers both matching and mismatching aligned bases; the
/// distinction is not needed downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    Match,
    Insertion,
    Deletion,
}

/// Run-length-encoded description of how a query aligns to a reference,
/// derived column-by-column from a gap-marked aligned pair.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditScript {
    runs: Vec<(EditOp, usize)>,
}

impl EditScript {
    /// Scan a gap-marked aligned pair left to right into run-length runs.
    ///
    /// A column with a query gap is a deletion, a column with a reference
    /// gap is an insertion, and any other column is a match/mismatch.
    /// Consecutive same-type columns coalesce; the pending run is always
    /// flushed at the end, and an empty pair yields an empty script.
    #[must_use]
    pub fn from_aligned_pair(aligned_reference: &[u8], aligned_query: &[u8]) -> Self {
        let mut runs: Vec<(EditOp, usize)> = Vec::new();
        let mut current: Option<(EditOp, usize)> = None;

        for (r, q) in aligned_reference.iter().zip(aligned_query) {
            let op = if *q == GAP {
                EditOp::Deletion
            } else if *r == GAP {
                EditOp::Insertion
            } else {
                EditOp::Match
            };

            match current {
                Some((prev, len)) if prev == op => current = Some((prev, len + 1)),
                Some(run) => {
                    runs.push(run);
                    current = Some((op, 1));
                }
                None => current = Some((op, 1)),
            }
        }

        if let Some(run) = current {
            runs.push(run);
        }

        Self { runs }
    }

    #[must_use]
    pub fn runs(&self) -> &[(EditOp, usize)] {
        &self.runs
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Total reference bases consumed (match/mismatch and deletion runs).
    /// Always equals the ungapped length of the aligned reference the
    /// script was derived from.
    #[must_use]
    pub fn reference_len(&self) -> usize {
        self.runs
            .iter()
            .filter(|(op, _)| matches!(op, EditOp::Match | EditOp::Deletion))
            .map(|(_, len)| len)
            .sum()
    }

    /// Total query bases consumed (match/mismatch and insertion runs).
    #[must_use]
    pub fn query_len(&self) -> usize {
        self.runs
            .iter()
            .filter(|(op, _)| matches!(op, EditOp::Match | EditOp::Insertion))
            .map(|(_, len)| len)
            .sum()
    }

    /// Convert to a SAM CIGAR with `M`/`I`/`D` runs.
    #[must_use]
    pub fn to_cigar(&self) -> Cigar {
        self.runs
            .iter()
            .map(|(op, len)| {
                let kind = match op {
                    EditOp::Match => Kind::Match,
                    EditOp::Insertion => Kind::Insertion,
                    EditOp::Deletion => Kind::Deletion,
                };
                Op::new(kind, *len)
            })
            .collect()
    }
}
