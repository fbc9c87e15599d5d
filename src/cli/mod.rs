//! Command-line interface
//!
//! Argument parsing and validation. Paths given on the command line are
//! checked and resolved to absolute paths during parsing, so an invalid
//! invocation fails before the orchestrator is constructed.

pub mod output;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use crate::backend::{self, BackendConfig};
use crate::core::recipe::Recipe;
use crate::core::run::{FailurePolicy, RunResult, Runner, RunnerOptions};
use crate::core::work::Working;

/// Default dist-git base the `git` downloader clones packages from
const DEFAULT_GIT_BASE_URL: &str = "https://src.fedoraproject.org/rpms";

/// pkgstack - build an ordered stack of source packages
///
/// Groups in the recipe are built strictly in order; packages within a
/// group may build concurrently with `--jobs`.
#[derive(Parser, Debug)]
#[command(name = "pkgstack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Recipe file (YAML)
    pub recipe_file: PathBuf,

    /// Recipe id: the top-level key to build from the recipe file
    pub recipe_id: String,

    /// Builder backend
    #[arg(short = 'b', long = "build", default_value = "dummy")]
    pub build: String,

    /// Downloader backend
    #[arg(short = 'd', long = "download", default_value = "none")]
    pub download: String,

    /// Branch checked out by source-control downloaders
    #[arg(short = 'B', long)]
    pub branch: Option<String>,

    /// File with `download:`/`build:` command lists for custom backends
    #[arg(short = 'c', long, value_parser = readable_file)]
    pub custom_file: Option<PathBuf>,

    /// Work directory for sources, build output and resume state
    /// (must exist; default: a fresh temporary directory)
    #[arg(short = 'w', long, value_parser = existing_dir)]
    pub work_directory: Option<PathBuf>,

    /// Source tree consulted by the `local` downloader (default: cwd)
    #[arg(short = 's', long, value_parser = existing_dir)]
    pub source_directory: Option<PathBuf>,

    /// Base URL the `git` downloader clones `<package>.git` from
    #[arg(short = 'u', long, default_value = DEFAULT_GIT_BASE_URL)]
    pub git_base_url: String,

    /// Concurrent packages within a group; 0 means one per CPU
    /// (groups stay sequential regardless)
    #[arg(short = 'j', long, default_value_t = 1)]
    pub jobs: usize,

    /// What to do when a package fails: stop or continue
    #[arg(long, default_value = "stop")]
    pub on_failure: FailurePolicy,

    /// Raise the log level from info to debug
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Load the recipe, construct the selected backends, and run the
    /// orchestrator to completion.
    pub async fn run(self) -> Result<RunResult> {
        let recipe = Recipe::load(&self.recipe_file, &self.recipe_id)?;

        let source_directory = match self.source_directory {
            Some(path) => path,
            None => std::env::current_dir().context("cannot determine current directory")?,
        };
        let config = BackendConfig {
            branch: self.branch,
            custom_file: self.custom_file,
            source_directory,
            git_base_url: self.git_base_url,
        };
        let downloader = backend::downloader_for(&self.download, &config)?;
        let builder = backend::builder_for(&self.build, &config)?;

        let work_root = match self.work_directory {
            Some(path) => path,
            None => {
                // Kept after the run so build output stays reachable.
                let dir = tempfile::Builder::new()
                    .prefix("pkgstack-")
                    .tempdir()
                    .context("cannot create temporary work directory")?;
                dir.into_path()
            }
        };
        tracing::info!(work_directory = %work_root.display(), "work directory");

        let working = Working::new(&work_root)?;
        let options = RunnerOptions {
            jobs: self.jobs,
            on_failure: self.on_failure,
        };
        let runner = Runner::new(recipe, working, downloader, builder, options);

        let spinner = output::create_spinner(&format!(
            "building {} with {}/{}",
            self.recipe_id, self.download, self.build
        ));
        let result = runner.run().await?;
        spinner.finish_and_clear();

        output::print_summary(&result);
        Ok(result)
    }
}

/// Validate a directory option: must exist, stored as an absolute path
fn existing_dir(value: &str) -> Result<PathBuf, String> {
    let path = Path::new(value);
    if !path.is_dir() {
        return Err(format!("'{value}' is not an existing directory"));
    }
    path.canonicalize()
        .map_err(|e| format!("cannot resolve '{value}': {e}"))
}

/// Validate a file option: must be readable, stored as an absolute path
fn readable_file(value: &str) -> Result<PathBuf, String> {
    let path = Path::new(value);
    std::fs::File::open(path).map_err(|e| format!("cannot read '{value}': {e}"))?;
    path.canonicalize()
        .map_err(|e| format!("cannot resolve '{value}': {e}"))
}
