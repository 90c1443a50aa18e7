//! Smoke tests for the command-line interface.

#![cfg(feature = "cli")]

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_describes_the_tool() {
    Command::cargo_bin("thermo-align")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("thermal"));
}

#[test]
fn align_requires_both_frames() {
    Command::cargo_bin("thermo-align")
        .expect("binary")
        .args(["align", "only_thermal.png"])
        .assert()
        .failure();
}

#[test]
fn batch_reports_an_empty_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    Command::cargo_bin("thermo-align")
        .expect("binary")
        .args(["batch", dir.path().to_str().expect("utf8 path")])
        .assert()
        .success()
        .stdout(predicate::str::contains("no pairs found"));
}

#[test]
fn missing_input_file_fails_and_names_the_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    Command::cargo_bin("thermo-align")
        .expect("binary")
        .args([
            "align",
            dir.path().join("a_thermal.png").to_str().expect("utf8"),
            dir.path().join("a_optical.png").to_str().expect("utf8"),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("a_thermal.png"));
}
