//! Smoke tests for the todokv CLI.
//!
//! These tests verify basic CLI functionality:
//! - `todokv --version` outputs version info
//! - `todokv --help` outputs help text
//! - unknown commands fail

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a Command for the todokv binary.
fn todokv() -> Command {
    Command::new(env!("CARGO_BIN_EXE_todokv"))
}

#[test]
fn test_version_flag() {
    todokv()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("todokv"))
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_help_flag() {
    todokv()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("Options:"));
}

#[test]
fn test_list_help() {
    todokv()
        .args(["list", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--project"))
        .stdout(predicate::str::contains("--completed"));
}

#[test]
fn test_no_args_shows_usage() {
    todokv()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_invalid_command() {
    todokv()
        .arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}
