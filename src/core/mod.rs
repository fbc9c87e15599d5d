//! Core orchestration logic
//!
//! # Submodules
//!
//! - [`recipe`] - Recipe (YAML) parsing and normalization
//! - [`work`] - Numbered work directories and persisted package state
//! - [`specfile`] - Spec file macro overrides and changelog bumps
//! - [`run`] - The orchestrator: group barriers, worker pool, failure policy

pub mod recipe;
pub mod run;
pub mod specfile;
pub mod work;
