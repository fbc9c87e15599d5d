//! Pluggable download/build backends
//!
//! A backend is selected by a short name at startup and treated uniformly
//! afterwards. Both capabilities share the same shape: one required
//! primitive (`download` / `build`) plus a provided `run` that walks every
//! numbered work directory of a recipe and AND-aggregates the per-package
//! results without short-circuiting. The stop-on-failure policy decision
//! belongs to the orchestrator, not here.

pub mod builder;
pub mod downloader;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::core::recipe::{PackageSpec, Recipe};
use crate::core::specfile;
use crate::core::work::Working;
use crate::error::{BackendError, ConfigError, PkgstackError};

/// Changelog author recorded by spec file bumps
const CHANGELOG_AUTHOR: &str = "pkgstack <pkgstack@localhost>";

/// Known downloader backend names
pub const DOWNLOADERS: &[&str] = &["none", "local", "git", "custom"];

/// Known builder backend names
pub const BUILDERS: &[&str] = &["dummy", "mock", "custom"];

/// Settings shared by all backends, resolved at startup
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Branch override for source-control downloaders
    pub branch: Option<String>,

    /// Custom file with backend-specific command lists (absolute path)
    pub custom_file: Option<PathBuf>,

    /// Source tree consulted by the `local` downloader
    pub source_directory: PathBuf,

    /// Base URL packages are cloned from by the `git` downloader
    pub git_base_url: String,
}

/// Fetches or prepares package sources into a work directory
pub trait Downloader: std::fmt::Debug + Send + Sync {
    /// Backend name, as selected on the command line
    fn name(&self) -> &'static str;

    /// Fetch sources for `package` into `dir`.
    ///
    /// "Nothing to download" is success, not an error.
    fn download(&self, package: &PackageSpec, dir: &Path) -> Result<(), BackendError>;

    /// Download every package of the recipe, visiting all of them even
    /// after a failure. Returns whether every download succeeded.
    fn run(&self, recipe: &Recipe, work: &Working) -> Result<bool, PkgstackError> {
        let mut all_ok = true;
        for pair in work.each_num_dir(recipe) {
            let (pkg, dir) = pair?;
            match self.download(&pkg, dir.path()) {
                Ok(()) => tracing::debug!(package = %pkg.name, "downloaded"),
                Err(e) => {
                    tracing::warn!(package = %pkg.name, error = %e, "download failed");
                    all_ok = false;
                }
            }
        }
        Ok(all_ok)
    }
}

/// Produces build output for a package inside its work directory
pub trait Builder: std::fmt::Debug + Send + Sync {
    /// Backend name, as selected on the command line
    fn name(&self) -> &'static str;

    /// Build `package` from the sources in `dir`
    fn build(&self, package: &PackageSpec, dir: &Path) -> Result<(), BackendError>;

    /// Pre-build spec file edits: macro overrides and the changelog bump.
    ///
    /// A work directory without a `<name>.spec` (dummy sources) is left
    /// alone.
    fn prepare(&self, package: &PackageSpec, dir: &Path) -> Result<(), BackendError> {
        let Some(spec_path) = specfile::locate_spec(dir, &package.name) else {
            return Ok(());
        };
        specfile::apply_overrides(package, &spec_path)?;
        specfile::bump_changelog(package, &spec_path, CHANGELOG_AUTHOR)
    }

    /// Build every package of the recipe, visiting all of them even after
    /// a failure. Returns whether every build succeeded.
    fn run(&self, recipe: &Recipe, work: &Working) -> Result<bool, PkgstackError> {
        let mut all_ok = true;
        for pair in work.each_num_dir(recipe) {
            let (pkg, dir) = pair?;
            let result = self
                .prepare(&pkg, dir.path())
                .and_then(|()| self.build(&pkg, dir.path()));
            match result {
                Ok(()) => tracing::debug!(package = %pkg.name, "built"),
                Err(e) => {
                    tracing::warn!(package = %pkg.name, error = %e, "build failed");
                    all_ok = false;
                }
            }
        }
        Ok(all_ok)
    }
}

/// Command lists read from the custom file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomFile {
    /// Shell commands run per package by the `custom` downloader
    #[serde(default)]
    pub download: Vec<String>,

    /// Shell commands run per package by the `custom` builder
    #[serde(default)]
    pub build: Vec<String>,

    /// Extra environment exported to every custom command
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl CustomFile {
    /// Load the command lists for a backend that requires them
    pub fn load(config: &BackendConfig, backend: &str) -> Result<Self, ConfigError> {
        let path = config
            .custom_file
            .as_ref()
            .ok_or_else(|| ConfigError::CustomFileRequired {
                backend: backend.to_string(),
            })?;
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::CustomFileInvalid {
                path: path.clone(),
                error: e.to_string(),
            })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::CustomFileInvalid {
            path: path.clone(),
            error: e.to_string(),
        })
    }
}

/// Construct the downloader backend selected by name.
///
/// The registry is static; an unknown name fails fast at startup.
pub fn downloader_for(
    name: &str,
    config: &BackendConfig,
) -> Result<Arc<dyn Downloader>, ConfigError> {
    match name {
        "none" => Ok(Arc::new(downloader::NoneDownloader)),
        "local" => Ok(Arc::new(downloader::LocalDownloader::new(
            config.source_directory.clone(),
        ))),
        "git" => Ok(Arc::new(downloader::GitDownloader::new(
            config.git_base_url.clone(),
            config.branch.clone(),
        ))),
        "custom" => Ok(Arc::new(downloader::CustomDownloader::new(
            CustomFile::load(config, "custom")?,
        ))),
        other => Err(ConfigError::UnknownDownloader {
            name: other.to_string(),
            known: DOWNLOADERS.join(", "),
        }),
    }
}

/// Construct the builder backend selected by name.
pub fn builder_for(name: &str, config: &BackendConfig) -> Result<Arc<dyn Builder>, ConfigError> {
    match name {
        "dummy" => Ok(Arc::new(builder::DummyBuilder)),
        "mock" => Ok(Arc::new(builder::MockBuilder::new()?)),
        "custom" => Ok(Arc::new(builder::CustomBuilder::new(CustomFile::load(
            config, "custom",
        )?))),
        other => Err(ConfigError::UnknownBuilder {
            name: other.to_string(),
            known: BUILDERS.join(", "),
        }),
    }
}
