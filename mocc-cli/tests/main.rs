#![allow(missing_docs)]

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::NamedTempFile;
use predicates::str::contains;

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn help() {
    Command::cargo_bin("mocc").unwrap().arg("--help").assert().success().stdout(contains("Usage: mocc"));
}

#[test]
fn check_reports_geometry_statistics() {
    Command::cargo_bin("mocc")
        .unwrap()
        .args(["check", &fixture("single_pin.yaml")])
        .assert()
        .success()
        .stdout(contains("fsr count"));
}

#[test]
fn solve_converges_on_a_single_reflected_pin() {
    Command::cargo_bin("mocc")
        .unwrap()
        .args(["solve", &fixture("single_pin.yaml"), "--max-outer", "15"])
        .assert()
        .success()
        .stdout(contains("converged k ="));
}

#[test]
fn solve_without_cmfd_still_converges() {
    Command::cargo_bin("mocc")
        .unwrap()
        .args(["solve", &fixture("single_pin.yaml"), "--no-cmfd", "--max-outer", "15"])
        .assert()
        .success()
        .stdout(contains("converged k ="));
}

#[test]
fn malformed_configuration_file_is_reported_as_an_error() {
    let file = NamedTempFile::new("broken.yaml").unwrap();
    file.write_str("not: [valid, mocc, configuration").unwrap();

    Command::cargo_bin("mocc")
        .unwrap()
        .args(["check", file.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn missing_configuration_file_is_reported_as_an_error() {
    Command::cargo_bin("mocc")
        .unwrap()
        .args(["solve", &fixture("does_not_exist.yaml")])
        .assert()
        .failure()
        .stderr(contains("error:"));
}
