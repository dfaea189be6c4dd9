//! Common test utilities for todokv integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't touch the
//! user's `~/.local/share/todokv/` database or `~/.config/todokv/` config.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// A test environment with an isolated database and config file.
///
/// The `todokv()` method returns a `Command` that sets `TODOKV_DB` and
/// `TODOKV_CONFIG` per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with an isolated directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the todokv binary bound to this environment.
    pub fn todokv(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_todokv"));
        cmd.current_dir(self.dir.path());
        cmd.env("TODOKV_DB", self.db_path());
        cmd.env("TODOKV_CONFIG", self.config_path());
        cmd.env_remove("TODOKV_LOG");
        cmd
    }

    /// Run `todokv add` with extra args and return the new id.
    pub fn add(&self, args: &[&str]) -> String {
        let output = self.todokv().arg("add").args(args).output().unwrap();
        assert!(
            output.status.success(),
            "add failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        json["id"].as_str().unwrap().to_string()
    }

    /// Run a command expected to succeed and parse its JSON stdout.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.todokv().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "{:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("todos.db")
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.kdl")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
