//! Error types for pkgstack
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Recipe document errors
#[derive(Error, Debug)]
pub enum RecipeError {
    /// Recipe file could not be read
    #[error("Failed to read recipe '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },

    /// Recipe document is not valid YAML
    #[error("Failed to parse recipe: {error}")]
    ParseError { error: String },

    /// Requested recipe id is not a top-level key of the document
    #[error("Recipe '{name}' not found in document")]
    RecipeNotFound { name: String },

    /// Recipe has no `packages` list
    #[error("Recipe '{name}' has no 'packages' list")]
    MissingPackages { name: String },

    /// A group is not a sequence of package entries
    #[error("Group {index} is not a sequence of package entries")]
    GroupNotSequence { index: usize },

    /// A package entry maps more than one name
    #[error("Package entry in group {group} maps {count} names (exactly one allowed)")]
    AmbiguousEntry { group: usize, count: usize },

    /// A package entry is neither a name nor a one-key mapping
    #[error("Invalid package entry in group {group}: {detail}")]
    InvalidEntry { group: usize, detail: String },

    /// A macro override value is not a scalar
    #[error("Macro '{name}' for package '{package}' is not a scalar value")]
    InvalidMacro { package: String, name: String },
}

/// Work directory errors
#[derive(Error, Debug)]
pub enum WorkError {
    /// Work root cannot be created or used
    #[error("Work directory unavailable at '{path}': {error}")]
    DirectoryUnavailable { path: PathBuf, error: String },

    /// Persisted state could not be read
    #[error("Failed to read state from '{path}': {error}")]
    StateRead { path: PathBuf, error: String },

    /// Persisted state could not be written
    #[error("Failed to write state to '{path}': {error}")]
    StateWrite { path: PathBuf, error: String },

    /// Persisted state record is not valid
    #[error("Invalid state record in '{path}': {error}")]
    StateParse { path: PathBuf, error: String },
}

/// Backend (download/build) errors, recorded per package
#[derive(Error, Debug)]
pub enum BackendError {
    /// Download primitive failed
    #[error("Download failed for '{package}': {reason}")]
    DownloadFailed { package: String, reason: String },

    /// Build primitive failed
    #[error("Build failed for '{package}': {reason}")]
    BuildFailed { package: String, reason: String },

    /// External command exited unsuccessfully
    #[error("Command '{command}' failed for '{package}': {detail}")]
    CommandFailed {
        package: String,
        command: String,
        detail: String,
    },

    /// Spec file edit failed
    #[error("Failed to edit spec file for '{package}': {error}")]
    SpecEdit { package: String, error: String },

    /// IO error while preparing the work directory
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },
}

/// Startup configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Unknown downloader backend name
    #[error("Unknown downloader '{name}' (known: {known})")]
    UnknownDownloader { name: String, known: String },

    /// Unknown builder backend name
    #[error("Unknown builder '{name}' (known: {known})")]
    UnknownBuilder { name: String, known: String },

    /// Backend requires a custom file but none was given
    #[error("Backend '{backend}' requires --custom-file")]
    CustomFileRequired { backend: String },

    /// Custom file could not be read or parsed
    #[error("Invalid custom file '{path}': {error}")]
    CustomFileInvalid { path: PathBuf, error: String },

    /// Required external tool is missing
    #[error("Backend '{backend}' requires '{tool}' on PATH")]
    ToolNotFound { backend: String, tool: String },

    /// Path option does not point at a usable location
    #[error("Invalid path for {option}: '{path}': {error}")]
    InvalidPath {
        option: String,
        path: PathBuf,
        error: String,
    },
}

/// Top-level pkgstack error type
#[derive(Error, Debug)]
pub enum PkgstackError {
    /// Recipe error
    #[error("Recipe error: {0}")]
    Recipe(#[from] RecipeError),

    /// Work directory error
    #[error("Work error: {0}")]
    Work(#[from] WorkError),

    /// Backend error
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO error
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Generic error
    #[error("{0}")]
    Generic(String),
}
