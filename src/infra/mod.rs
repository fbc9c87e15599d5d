//! Infrastructure layer
//!
//! External side effects backends rely on: shell command execution,
//! filesystem copies, and git clones.

pub mod filesystem;
pub mod git;
pub mod process;
