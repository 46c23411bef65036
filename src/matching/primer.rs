use thiserror::Error;

/// Safely convert usize to f64 for similarity fractions. Primer windows are
/// tiny, so the conversion is always exact; the cast is just made explicit.
#[inline]
fn count_to_f64(count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PrimerError {
    #[error("sequences must be the same length ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },
}

/// Count positions at which two equal-length sequences differ.
///
/// # Errors
///
/// Returns `PrimerError::LengthMismatch` when the sequences differ in
/// length.
pub fn hamming_distance(a: &[u8], b: &[u8]) -> Result<usize, PrimerError> {
    if a.len() != b.len() {
        return Err(PrimerError::LengthMismatch { left: a.len(), right: b.len() });
    }

    Ok(a.iter().zip(b).filter(|(x, y)| x != y).count())
}

/// Fraction of positions at which `observed` matches `expected`.
///
/// Computed in `f64`, so a zero-length expected sequence yields `NaN`;
/// since `NaN` compares false against any threshold, a read can never pass
/// a filter against an empty primer.
///
/// # Errors
///
/// Returns `PrimerError::LengthMismatch` when the sequences differ in
/// length.
pub fn similarity(observed: &[u8], expected: &[u8]) -> Result<f64, PrimerError> {
    let dist = hamming_distance(observed, expected)?;

    Ok(count_to_f64(expected.len() - dist) / count_to_f64(expected.len()))
}

/// The primer sequences expected at either end of an amplicon's reference
/// window.
#[derive(Debug, Clone)]
pub struct PrimerPair {
    upstream: Vec<u8>,
    downstream: Vec<u8>,
}

impl PrimerPair {
    /// Extract the upstream/downstream primers as the first and last bases
    /// of the target's reference window.
    ///
    /// The target catalog guarantees the primer lengths fit the window.
    #[must_use]
    pub fn from_window(window: &[u8], upstream_len: usize, downstream_len: usize) -> Self {
        Self {
            upstream: window[..upstream_len].to_vec(),
            downstream: window[window.len() - downstream_len..].to_vec(),
        }
    }

    #[must_use]
    pub fn upstream(&self) -> &[u8] {
        &self.upstream
    }

    #[must_use]
    pub fn downstream(&self) -> &[u8] {
        &self.downstream
    }
}

/// Decide whether a read's flanking windows both look like the expected
/// primers.
///
/// The read's prefix is compared against the upstream primer and its suffix
/// against the downstream primer; both similarities must be strictly
/// greater than `threshold` (a read exactly at the threshold fails).
///
/// # Errors
///
/// Returns `PrimerError::LengthMismatch` when the read is shorter than
/// either primer. Callers treat this as a per-read rejection, not a fatal
/// error.
pub fn passes_filter(read: &[u8], primers: &PrimerPair, threshold: f64) -> Result<bool, PrimerError> {
    let up = primers.upstream();
    let down = primers.downstream();

    if read.len() < up.len() || read.len() < down.len() {
        return Err(PrimerError::LengthMismatch {
            left: read.len(),
            right: up.len().max(down.len()),
        });
    }

    let upstream_similarity = similarity(&read[..up.len()], up)?;
    let downstream_similarity = similarity(&read[read.len() - down.len()..], down)?;

    Ok(upstream_similarity > threshold && downstream_similarity > threshold)
}
