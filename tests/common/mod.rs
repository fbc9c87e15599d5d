//! Common test utilities and helpers
//!
//! Shared setup for integration tests: a temporary directory holding a
//! recipe file, a work directory, and whatever else a scenario needs.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use assert_fs::TempDir;

/// Test stack context
pub struct TestStack {
    /// Temporary directory the scenario lives in
    pub dir: TempDir,
}

impl TestStack {
    /// Create a new scenario directory with an empty work subdirectory
    pub fn new() -> Self {
        let stack = Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        };
        std::fs::create_dir_all(stack.work_dir()).expect("Failed to create work directory");
        stack
    }

    /// Root of the scenario directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The work directory passed via `-w`
    pub fn work_dir(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    /// Write the recipe file and return its path
    pub fn write_recipe(&self, content: &str) -> PathBuf {
        let path = self.dir.path().join("recipe.yml");
        std::fs::write(&path, content).expect("Failed to write recipe");
        path
    }

    /// Create a file under the scenario directory
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Read a file under the scenario directory
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Run the pkgstack binary with the given arguments
    pub fn run_pkgstack(&self, args: &[&str]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_pkgstack"));
        cmd.current_dir(self.path());
        for arg in args {
            cmd.arg(arg);
        }
        cmd.output().expect("Failed to execute pkgstack")
    }
}

impl Default for TestStack {
    fn default() -> Self {
        Self::new()
    }
}
