use bio::alignment::pairwise::Aligner;
use bio::alignment::AlignmentOperation;

/// Gap marker used in aligned sequence pairs.
pub const GAP: u8 = b'-';

/// The outcome of a pairwise alignment: the two sequences padded to equal
/// length with [`GAP`] markers, plus the score.
///
/// Transient: produced per read, consumed to build an edit script.
#[derive(Debug, Clone)]
pub struct AlignmentResult {
    pub aligned_reference: Vec<u8>,
    pub aligned_query: Vec<u8>,
    pub score: i32,
    /// Fraction of aligned columns that differ (mismatches and gaps).
    /// Informational; the accept/reject decision uses only `score`.
    pub distance: f64,
}

/// End-to-end pairwise alignment of a read against a reference window.
///
/// The core depends only on this contract; the production implementation
/// wraps a dynamic-programming aligner, and tests substitute scripted
/// results.
pub trait GlobalAligner {
    fn align(&mut self, reference: &[u8], query: &[u8]) -> AlignmentResult;
}

/// Nucleotide substitution score in the NUC4.4 style: +5 for identity, -4
/// for a mismatch, -2 for anything involving an ambiguous `N` so masked
/// sequence neither anchors nor dominates an alignment.
fn nuc44(a: u8, b: u8) -> i32 {
    let (a, b) = (a.to_ascii_uppercase(), b.to_ascii_uppercase());
    if a == b'N' || b == b'N' {
        -2
    } else if a == b {
        5
    } else {
        -4
    }
}

/// Production [`GlobalAligner`] backed by `bio`'s affine-gap pairwise
/// aligner in global mode.
pub struct NucAligner {
    inner: Aligner<fn(u8, u8) -> i32>,
}

impl NucAligner {
    /// Create an aligner with the run's gap penalties (negative values,
    /// e.g. -14 open / -4 extend). The aligner reuses its internal DP
    /// buffers across calls, so one instance serves the whole run.
    #[must_use]
    pub fn new(gap_open: i32, gap_extend: i32) -> Self {
        Self {
            inner: Aligner::new(gap_open, gap_extend, nuc44 as fn(u8, u8) -> i32),
        }
    }
}

impl GlobalAligner for NucAligner {
    fn align(&mut self, reference: &[u8], query: &[u8]) -> AlignmentResult {
        let alignment = self.inner.global(query, reference);

        let mut aligned_reference = Vec::with_capacity(alignment.operations.len());
        let mut aligned_query = Vec::with_capacity(alignment.operations.len());
        let (mut qi, mut ri) = (0usize, 0usize);

        for op in &alignment.operations {
            match op {
                AlignmentOperation::Match | AlignmentOperation::Subst => {
                    aligned_query.push(query[qi]);
                    aligned_reference.push(reference[ri]);
                    qi += 1;
                    ri += 1;
                }
                AlignmentOperation::Ins => {
                    aligned_query.push(query[qi]);
                    aligned_reference.push(GAP);
                    qi += 1;
                }
                AlignmentOperation::Del => {
                    aligned_query.push(GAP);
                    aligned_reference.push(reference[ri]);
                    ri += 1;
                }
                // Global mode consumes both sequences fully; clips only
                // appear in local/custom modes.
                AlignmentOperation::Xclip(n) => qi += n,
                AlignmentOperation::Yclip(n) => ri += n,
            }
        }

        let distance = column_distance(&aligned_reference, &aligned_query);

        AlignmentResult {
            aligned_reference,
            aligned_query,
            score: alignment.score,
            distance,
        }
    }
}

fn column_distance(aligned_reference: &[u8], aligned_query: &[u8]) -> f64 {
    if aligned_reference.is_empty() {
        return 0.0;
    }

    let differing = aligned_reference
        .iter()
        .zip(aligned_query)
        .filter(|(r, q)| !r.eq_ignore_ascii_case(q))
        .count();

    #[allow(clippy::cast_precision_loss)]
    {
        differing as f64 / aligned_reference.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_sequences_align_cleanly() {
        let mut aligner = NucAligner::new(-14, -4);
        let result = aligner.align(b"ACGTACGT", b"ACGTACGT");

        assert_eq!(result.aligned_reference, b"ACGTACGT");
        assert_eq!(result.aligned_query, b"ACGTACGT");
        assert_eq!(result.score, 40);
        assert!(result.distance.abs() < 1e-9);
    }

    #[test]
    fn test_deletion_marks_query_gap() {
        let mut aligner = NucAligner::new(-6, -1);
        // Query is missing the middle bases of the reference.
        let result = aligner.align(b"ACGTTTTTTTTTACGT", b"ACGTACGT");

        assert_eq!(result.aligned_reference.len(), result.aligned_query.len());
        assert_eq!(result.aligned_reference.len(), 16);
        assert!(result.aligned_query.contains(&GAP));
        assert!(!result.aligned_reference.contains(&GAP));
    }

    #[test]
    fn test_insertion_marks_reference_gap() {
        let mut aligner = NucAligner::new(-6, -1);
        let result = aligner.align(b"ACGTACGT", b"ACGTTTTTTTTTACGT");

        assert_eq!(result.aligned_reference.len(), result.aligned_query.len());
        assert!(result.aligned_reference.contains(&GAP));
        assert!(!result.aligned_query.contains(&GAP));
    }

    #[test]
    fn test_mismatch_scoring() {
        let mut aligner = NucAligner::new(-14, -4);
        // One substitution in eight bases: 7 * 5 - 4.
        let result = aligner.align(b"ACGTACGT", b"ACGTACGA");
        assert_eq!(result.score, 31);
        assert!((result.distance - 0.125).abs() < 1e-9);
    }

    #[test]
    fn test_n_scores_mildly_negative() {
        assert_eq!(nuc44(b'N', b'A'), -2);
        assert_eq!(nuc44(b'a', b'A'), 5);
        assert_eq!(nuc44(b'C', b'G'), -4);
    }
}
