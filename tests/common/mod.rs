//! Common test utilities for taskdeck integration tests.
//!
//! Provides `TestEnv` for isolated test environments that never touch the
//! developer's own `.tasks`/`.epics` trees.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// A test environment with isolated storage roots.
///
/// Each `TestEnv` creates one temporary directory holding both the tasks
/// root and the epics root. The `td()` method returns a `Command` that
/// passes both roots explicitly, making tests parallel-safe.
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment with a queue named `q` ready to use.
    pub fn with_queue() -> Self {
        let env = Self::new();
        env.td()
            .args(["queue", "add", "--name", "q", "--title", "Q"])
            .assert()
            .success();
        env
    }

    /// Get a Command for the td binary pointed at the isolated roots.
    pub fn td(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_td"));
        cmd.current_dir(self.dir.path());
        cmd.arg("--tasks-root");
        cmd.arg(self.tasks_root());
        cmd.arg("--epics-root");
        cmd.arg(self.epics_root());
        cmd
    }

    pub fn tasks_root(&self) -> std::path::PathBuf {
        self.dir.path().join(".tasks")
    }

    pub fn epics_root(&self) -> std::path::PathBuf {
        self.dir.path().join(".epics")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
