//! Work directory management
//!
//! Each package in a recipe is bound to a numbered subdirectory of the work
//! root for the duration of a run. The number is the package's 1-based
//! position across all groups, so the assignment is deterministic and a
//! re-run over the same root finds the same directories again. Every
//! numbered directory carries a small `state.toml` record that survives
//! process restart; a package whose recorded state is `built` is skipped on
//! resumption.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::recipe::{PackageSpec, Recipe};
use crate::error::WorkError;

/// Name of the per-directory state record
const STATE_FILE: &str = "state.toml";

/// Package lifecycle state, persisted per numbered directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageState {
    /// Not yet visited
    Pending,
    /// Download primitive in progress
    Downloading,
    /// Sources present in the work directory
    Downloaded,
    /// Build primitive in progress
    Building,
    /// Terminal: build output produced
    Built,
    /// Terminal: a primitive failed
    Failed,
}

impl PackageState {
    /// Whether the state is terminal (`built` or `failed`)
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Built | Self::Failed)
    }
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Downloaded => "downloaded",
            Self::Building => "building",
            Self::Built => "built",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PackageState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "downloading" => Ok(Self::Downloading),
            "downloaded" => Ok(Self::Downloaded),
            "building" => Ok(Self::Building),
            "built" => Ok(Self::Built),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown package state '{other}'")),
        }
    }
}

/// Persisted state record (`state.toml`)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateRecord {
    /// Package the directory is bound to
    package: String,
    /// Lifecycle state
    state: PackageState,
}

/// A numbered work directory bound to one package
#[derive(Debug, Clone)]
pub struct WorkDir {
    num: usize,
    path: PathBuf,
    package: String,
}

impl WorkDir {
    /// 1-based directory number (the package's position in the recipe)
    pub fn num(&self) -> usize {
        self.num
    }

    /// Filesystem path of the directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted lifecycle state; a missing record is `pending`
    pub fn state(&self) -> Result<PackageState, WorkError> {
        let state_path = self.path.join(STATE_FILE);
        if !state_path.exists() {
            return Ok(PackageState::Pending);
        }
        let content = std::fs::read_to_string(&state_path).map_err(|e| WorkError::StateRead {
            path: state_path.clone(),
            error: e.to_string(),
        })?;
        let record: StateRecord =
            toml::from_str(&content).map_err(|e| WorkError::StateParse {
                path: state_path,
                error: e.to_string(),
            })?;
        Ok(record.state)
    }

    /// Persist a lifecycle state transition
    pub fn set_state(&self, state: PackageState) -> Result<(), WorkError> {
        let record = StateRecord {
            package: self.package.clone(),
            state,
        };
        let content = toml::to_string(&record).map_err(|e| WorkError::StateWrite {
            path: self.path.join(STATE_FILE),
            error: e.to_string(),
        })?;
        let state_path = self.path.join(STATE_FILE);
        std::fs::write(&state_path, content).map_err(|e| WorkError::StateWrite {
            path: state_path,
            error: e.to_string(),
        })
    }
}

/// Work manager: owns the package -> numbered-directory mapping and the
/// persisted state under one work root.
#[derive(Debug, Clone)]
pub struct Working {
    root: PathBuf,
}

impl Working {
    /// Open (creating if needed) a work root.
    ///
    /// Fails with `DirectoryUnavailable` if the root cannot be created or
    /// is not a writable directory.
    pub fn new(root: &Path) -> Result<Self, WorkError> {
        std::fs::create_dir_all(root).map_err(|e| WorkError::DirectoryUnavailable {
            path: root.to_path_buf(),
            error: e.to_string(),
        })?;

        // Probe writability up front rather than failing mid-run.
        let probe = root.join(".pkgstack-probe");
        std::fs::write(&probe, b"").map_err(|e| WorkError::DirectoryUnavailable {
            path: root.to_path_buf(),
            error: e.to_string(),
        })?;
        let _ = std::fs::remove_file(&probe);

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// The work root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily yield `(package, numbered directory)` pairs in recipe order.
    ///
    /// Directory numbers are assigned from recipe position, never from a
    /// filesystem scan, so repeated calls (and repeated runs over the same
    /// root) produce the same assignment. Directories are created on first
    /// visit and reused afterwards.
    pub fn each_num_dir<'a>(
        &'a self,
        recipe: &'a Recipe,
    ) -> impl Iterator<Item = Result<(PackageSpec, WorkDir), WorkError>> + 'a {
        recipe
            .packages()
            .enumerate()
            .map(move |(index, pkg)| Ok((pkg.clone(), self.num_dir(index + 1, &pkg.name)?)))
    }

    /// Locate (creating if needed) the numbered directory for one position
    pub fn num_dir(&self, num: usize, package: &str) -> Result<WorkDir, WorkError> {
        let path = self.root.join(format!("{num}"));
        if !path.exists() {
            std::fs::create_dir_all(&path).map_err(|e| WorkError::DirectoryUnavailable {
                path: path.clone(),
                error: e.to_string(),
            })?;
        }
        Ok(WorkDir {
            num,
            path,
            package: package.to_string(),
        })
    }
}
