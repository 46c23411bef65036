//! Binary-level CLI tests.

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("amplicon-realigner").unwrap()
}

#[test]
fn help_describes_the_tool() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--primer-similarity"))
        .stdout(predicate::str::contains("--min-score"));
}

#[test]
fn missing_arguments_fail_with_usage() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn unreadable_targets_file_is_fatal() {
    cmd()
        .args(["-i", "missing.bam", "-t", "missing.bed", "-o", "out.bam", "-r", "ref.fa"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not read target file"));
}

#[test]
fn unreadable_alignment_source_is_fatal() {
    let dir = tempfile::TempDir::new().unwrap();
    let targets = dir.path().join("targets.bed");
    std::fs::write(&targets, "chr1\t100\t200\tamp1\t0\t+\t120\t180\n").unwrap();

    cmd()
        .args(["-i", "missing.bam", "-o", "out.bam", "-r", "ref.fa"])
        .args(["-t", targets.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not open alignment file"));
}

#[test]
fn malformed_target_record_is_fatal() {
    let dir = tempfile::TempDir::new().unwrap();
    let targets = dir.path().join("targets.bed");
    std::fs::write(&targets, "chr1\tnot-a-number\t200\tamp1\t0\t+\t120\t180\n").unwrap();

    cmd()
        .args(["-i", "missing.bam", "-o", "out.bam", "-r", "ref.fa"])
        .args(["-t", targets.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected an integer"));
}
