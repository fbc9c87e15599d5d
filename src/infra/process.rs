//! External command execution
//!
//! Custom and mock backends run user-supplied shell commands per package.
//! The package name is exported as `PKG` so command lists can refer to it.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

use crate::error::BackendError;

/// Run one shell command in `cwd` with `PKG=<package>` exported.
///
/// Output is captured; on a non-zero exit the tail of stderr becomes the
/// failure reason.
pub fn run_shell(
    package: &str,
    command: &str,
    cwd: &Path,
    env: &BTreeMap<String, String>,
) -> Result<(), BackendError> {
    tracing::debug!(package, command, "running");

    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .env("PKG", package)
        .envs(env)
        .output()
        .map_err(|e| BackendError::CommandFailed {
            package: package.to_string(),
            command: command.to_string(),
            detail: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BackendError::CommandFailed {
            package: package.to_string(),
            command: command.to_string(),
            detail: format!("exit {}: {}", output.status, tail(&stderr, 10)),
        });
    }
    Ok(())
}

/// Last `lines` lines of command output, for error reporting
fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.trim_end().lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
