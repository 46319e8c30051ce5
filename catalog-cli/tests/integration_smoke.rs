//! Smoke tests to verify command wiring

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_top_level_help_lists_serve() {
    let mut cmd = Command::cargo_bin("catalog").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn test_serve_help_lists_database_options() {
    let mut cmd = Command::cargo_bin("catalog").unwrap();
    cmd.arg("serve").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--database-url"))
        .stdout(predicate::str::contains("--pool-timeout"))
        .stdout(predicate::str::contains("--in-memory"));
}

#[test]
fn test_serve_rejects_non_numeric_pool_size() {
    let mut cmd = Command::cargo_bin("catalog").unwrap();
    cmd.arg("serve").arg("--pool-size").arg("many");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_version_flag() {
    let mut cmd = Command::cargo_bin("catalog").unwrap();
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("catalog"));
}
