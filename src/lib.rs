//! pkgstack - ordered package-stack build orchestrator
//!
//! Builds an ordered collection of source packages where later packages
//! depend on build artifacts of earlier ones. A YAML recipe supplies the
//! grouping and order; pluggable downloader/builder backends do the
//! mechanical work.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line parsing and output formatting
//! - [`core`] - Recipe model, work manager, orchestrator
//! - [`backend`] - Downloader/Builder contract and concrete backends
//! - [`infra`] - External side effects (git, processes, filesystem)
//! - [`error`] - Error types

pub mod backend;
pub mod cli;
pub mod core;
pub mod error;
pub mod infra;
