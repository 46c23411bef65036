//! Realignment decision engine.
//!
//! Reads whose alignment ends in a soft clip are realigned end-to-end
//! against their target's reference window; the resulting edit script
//! replaces the read's alignment only when the alignment score clears the
//! configured minimum. Reads without terminal soft clips pass through
//! untouched apart from tag cleanup.
//!
//! Tag policy (the only tags surviving this engine):
//!
//! - realigned: `RG`, new `AS`, `CO` (target name), `XC` (pre-correction
//!   CIGAR)
//! - passthrough / rejected: `RG`, pre-existing `AS` (when present), `CO`

pub mod aligner;
pub mod edit_script;

use noodles::core::Position;
use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record_buf::data::field::Value;
use noodles::sam::alignment::record_buf::{Cigar, Data, RecordBuf};
use thiserror::Error;

use crate::core::interval::GenomicInterval;

pub use aligner::{AlignmentResult, GlobalAligner, NucAligner, GAP};
pub use edit_script::{EditOp, EditScript};

/// Tag carrying the target name a record was realigned against.
pub const TARGET_NAME_TAG: Tag = Tag::new(b'C', b'O');

/// Tag preserving a realigned record's pre-correction CIGAR string.
pub const PRE_REALIGN_CIGAR_TAG: Tag = Tag::new(b'X', b'C');

#[derive(Error, Debug)]
pub enum RealignError {
    #[error("target start {0} is not a valid alignment position")]
    InvalidTargetStart(u64),
}

/// How a read left the engine. Every outcome is written to the output; the
/// distinction is observable only through tags and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No terminal soft clip; existing alignment kept.
    Passthrough,
    /// Realignment accepted; edit script and position replaced.
    Realigned { score: i32 },
    /// Realignment scored at or below the minimum; original kept.
    Rejected { score: i32 },
}

/// Per-read realignment driver. One engine (and one aligner) serves the
/// whole run.
pub struct RealignmentEngine<A> {
    aligner: A,
    min_score: i32,
}

impl<A: GlobalAligner> RealignmentEngine<A> {
    pub fn new(aligner: A, min_score: i32) -> Self {
        Self { aligner, min_score }
    }

    /// Decide and apply the realignment policy for one read against one
    /// target.
    ///
    /// `reference_window` is the target's full reference sequence; the
    /// read's sequence is aligned end-to-end against it. The accept
    /// decision requires the score to *strictly* exceed the configured
    /// minimum.
    ///
    /// # Errors
    ///
    /// Returns `RealignError::InvalidTargetStart` if the target's start is
    /// not representable as an alignment position.
    pub fn process(
        &mut self,
        record: &mut RecordBuf,
        target: &GenomicInterval,
        reference_window: &[u8],
    ) -> Result<Outcome, RealignError> {
        if !has_terminal_soft_clip(record.cigar()) {
            retain_kept_tags(record, &target.name);
            return Ok(Outcome::Passthrough);
        }

        let query = record.sequence().as_ref().to_vec();
        let result = self.aligner.align(reference_window, &query);
        let script =
            EditScript::from_aligned_pair(&result.aligned_reference, &result.aligned_query);

        if result.score > self.min_score {
            apply_realignment(record, target, &script, result.score)?;
            Ok(Outcome::Realigned { score: result.score })
        } else {
            retain_kept_tags(record, &target.name);
            Ok(Outcome::Rejected { score: result.score })
        }
    }
}

/// Leading or trailing soft clip marks a read as a realignment candidate.
fn has_terminal_soft_clip(cigar: &Cigar) -> bool {
    let ops = cigar.as_ref();
    matches!(ops.first(), Some(op) if op.kind() == Kind::SoftClip)
        || matches!(ops.last(), Some(op) if op.kind() == Kind::SoftClip)
}

/// Replace the record's alignment with the accepted edit script: new CIGAR,
/// start reset to the target start, tags reduced to `RG` plus the new
/// `AS`/`CO`/`XC`.
fn apply_realignment(
    record: &mut RecordBuf,
    target: &GenomicInterval,
    script: &EditScript,
    score: i32,
) -> Result<(), RealignError> {
    let start = usize::try_from(target.start)
        .ok()
        .and_then(|p| Position::try_from(p).ok())
        .ok_or(RealignError::InvalidTargetStart(target.start))?;

    let read_group = record.data().get(&Tag::READ_GROUP).cloned();
    let original_cigar = cigar_string(record.cigar());

    let mut data = Data::default();
    if let Some(rg) = read_group {
        data.insert(Tag::READ_GROUP, rg);
    }
    data.insert(Tag::ALIGNMENT_SCORE, Value::from(score));
    data.insert(TARGET_NAME_TAG, Value::String(target.name.clone().into()));
    data.insert(PRE_REALIGN_CIGAR_TAG, Value::String(original_cigar.into()));

    *record.data_mut() = data;
    *record.cigar_mut() = script.to_cigar();
    *record.alignment_start_mut() = Some(start);

    Ok(())
}

/// Tag cleanup for reads kept as-is (passthrough and rejected): retain the
/// read group and any existing alignment score, stamp the target name, drop
/// everything else.
fn retain_kept_tags(record: &mut RecordBuf, target_name: &str) {
    let read_group = record.data().get(&Tag::READ_GROUP).cloned();
    let score = record.data().get(&Tag::ALIGNMENT_SCORE).cloned();

    let mut data = Data::default();
    if let Some(rg) = read_group {
        data.insert(Tag::READ_GROUP, rg);
    }
    if let Some(score) = score {
        data.insert(Tag::ALIGNMENT_SCORE, score);
    }
    data.insert(TARGET_NAME_TAG, Value::String(target_name.into()));

    *record.data_mut() = data;
}

/// Render a CIGAR in its text form, e.g. `5S45M`.
fn cigar_string(cigar: &Cigar) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    for op in cigar.as_ref() {
        let kind = match op.kind() {
            Kind::Match => 'M',
            Kind::Insertion => 'I',
            Kind::Deletion => 'D',
            Kind::Skip => 'N',
            Kind::SoftClip => 'S',
            Kind::HardClip => 'H',
            Kind::Pad => 'P',
            Kind::SequenceMatch => '=',
            Kind::SequenceMismatch => 'X',
        };
        let _ = write!(out, "{}{}", op.len(), kind);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use noodles::sam::alignment::record::cigar::op::Op;
    use noodles::sam::alignment::record::Flags;
    use noodles::sam::alignment::record_buf::Sequence;

    /// Aligner stub returning a canned result.
    struct ScriptedAligner(AlignmentResult);

    impl GlobalAligner for ScriptedAligner {
        fn align(&mut self, _reference: &[u8], _query: &[u8]) -> AlignmentResult {
            self.0.clone()
        }
    }

    /// Aligner stub for paths that must not align at all.
    struct UnreachableAligner;

    impl GlobalAligner for UnreachableAligner {
        fn align(&mut self, _reference: &[u8], _query: &[u8]) -> AlignmentResult {
            panic!("passthrough reads must not be realigned");
        }
    }

    fn target() -> GenomicInterval {
        GenomicInterval::with_name("chr1", 100, 107, "amp1")
    }

    fn record(cigar_ops: Vec<Op>) -> RecordBuf {
        let mut data = Data::default();
        data.insert(Tag::READ_GROUP, Value::String("rg1".into()));
        data.insert(Tag::ALIGNMENT_SCORE, Value::from(37));
        data.insert(Tag::EDIT_DISTANCE, Value::from(2));

        RecordBuf::builder()
            .set_flags(Flags::empty())
            .set_sequence(Sequence::from(b"ACGTACGT".to_vec()))
            .set_cigar(Cigar::from(cigar_ops))
            .set_alignment_start(Position::try_from(95).unwrap())
            .set_data(data)
            .build()
    }

    fn perfect_result(score: i32) -> AlignmentResult {
        AlignmentResult {
            aligned_reference: b"ACGTACGT".to_vec(),
            aligned_query: b"ACGTACGT".to_vec(),
            score,
            distance: 0.0,
        }
    }

    #[test]
    fn test_passthrough_without_soft_clip() {
        let mut engine = RealignmentEngine::new(UnreachableAligner, 50);
        let mut rec = record(vec![Op::new(Kind::Match, 8)]);

        let outcome = engine.process(&mut rec, &target(), b"ACGTACGT").unwrap();

        assert_eq!(outcome, Outcome::Passthrough);
        assert_eq!(rec.alignment_start(), Some(Position::try_from(95).unwrap()));
        assert_eq!(cigar_string(rec.cigar()), "8M");
        // RG and existing AS retained, CO stamped, everything else dropped.
        assert!(rec.data().get(&Tag::READ_GROUP).is_some());
        assert_eq!(
            rec.data().get(&Tag::ALIGNMENT_SCORE).and_then(Value::as_int),
            Some(37)
        );
        assert_eq!(
            rec.data().get(&TARGET_NAME_TAG),
            Some(&Value::String("amp1".into()))
        );
        assert!(rec.data().get(&Tag::EDIT_DISTANCE).is_none());
        assert!(rec.data().get(&PRE_REALIGN_CIGAR_TAG).is_none());
    }

    #[test]
    fn test_accept_replaces_alignment() {
        let mut engine = RealignmentEngine::new(ScriptedAligner(perfect_result(100)), 50);
        let mut rec = record(vec![Op::new(Kind::SoftClip, 3), Op::new(Kind::Match, 5)]);

        let outcome = engine.process(&mut rec, &target(), b"ACGTACGT").unwrap();

        assert_eq!(outcome, Outcome::Realigned { score: 100 });
        assert_eq!(cigar_string(rec.cigar()), "8M");
        assert_eq!(rec.alignment_start(), Some(Position::try_from(100).unwrap()));
        assert_eq!(
            rec.data().get(&Tag::ALIGNMENT_SCORE).and_then(Value::as_int),
            Some(100)
        );
        assert_eq!(
            rec.data().get(&PRE_REALIGN_CIGAR_TAG),
            Some(&Value::String("3S5M".into()))
        );
        assert_eq!(
            rec.data().get(&TARGET_NAME_TAG),
            Some(&Value::String("amp1".into()))
        );
        assert!(rec.data().get(&Tag::READ_GROUP).is_some());
        assert!(rec.data().get(&Tag::EDIT_DISTANCE).is_none());
    }

    #[test]
    fn test_score_at_minimum_is_rejected() {
        let mut engine = RealignmentEngine::new(ScriptedAligner(perfect_result(50)), 50);
        let mut rec = record(vec![Op::new(Kind::Match, 5), Op::new(Kind::SoftClip, 3)]);

        let outcome = engine.process(&mut rec, &target(), b"ACGTACGT").unwrap();

        assert_eq!(outcome, Outcome::Rejected { score: 50 });
        // Original alignment untouched.
        assert_eq!(cigar_string(rec.cigar()), "5M3S");
        assert_eq!(rec.alignment_start(), Some(Position::try_from(95).unwrap()));
        // Kept-read tag policy: RG, original AS, CO; no XC.
        assert_eq!(
            rec.data().get(&Tag::ALIGNMENT_SCORE).and_then(Value::as_int),
            Some(37)
        );
        assert!(rec.data().get(&PRE_REALIGN_CIGAR_TAG).is_none());
        assert!(rec.data().get(&Tag::EDIT_DISTANCE).is_none());
        assert_eq!(
            rec.data().get(&TARGET_NAME_TAG),
            Some(&Value::String("amp1".into()))
        );
    }

    #[test]
    fn test_missing_read_group_and_score_tolerated() {
        let mut engine = RealignmentEngine::new(UnreachableAligner, 50);
        let mut rec = RecordBuf::builder()
            .set_flags(Flags::empty())
            .set_sequence(Sequence::from(b"ACGTACGT".to_vec()))
            .set_cigar(Cigar::from(vec![Op::new(Kind::Match, 8)]))
            .build();

        let outcome = engine.process(&mut rec, &target(), b"ACGTACGT").unwrap();

        assert_eq!(outcome, Outcome::Passthrough);
        assert!(rec.data().get(&Tag::READ_GROUP).is_none());
        assert!(rec.data().get(&Tag::ALIGNMENT_SCORE).is_none());
        assert!(rec.data().get(&TARGET_NAME_TAG).is_some());
    }

    #[test]
    fn test_cigar_string_rendering() {
        let cigar = Cigar::from(vec![
            Op::new(Kind::SoftClip, 5),
            Op::new(Kind::Match, 40),
            Op::new(Kind::Deletion, 2),
            Op::new(Kind::Match, 3),
        ]);
        assert_eq!(cigar_string(&cigar), "5S40M2D3M");
    }

    #[test]
    fn test_soft_clip_detection() {
        let leading = Cigar::from(vec![Op::new(Kind::SoftClip, 5), Op::new(Kind::Match, 40)]);
        let trailing = Cigar::from(vec![Op::new(Kind::Match, 40), Op::new(Kind::SoftClip, 5)]);
        let none = Cigar::from(vec![Op::new(Kind::Match, 45)]);

        assert!(has_terminal_soft_clip(&leading));
        assert!(has_terminal_soft_clip(&trailing));
        assert!(!has_terminal_soft_clip(&none));
    }
}
