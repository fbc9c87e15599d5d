//! Downloader backends
//!
//! - `none`: no-op, always succeeds (the default)
//! - `local`: copies the package tree from a local source directory
//! - `git`: shallow-clones the package's dist-git repository
//! - `custom`: runs the `download:` command list from the custom file

use std::path::{Path, PathBuf};

use crate::backend::{CustomFile, Downloader};
use crate::core::recipe::PackageSpec;
use crate::error::BackendError;
use crate::infra::filesystem::copy_tree;
use crate::infra::git::clone_package;
use crate::infra::process::run_shell;

/// No-op downloader; useful when sources are already in place
#[derive(Debug)]
pub struct NoneDownloader;

impl Downloader for NoneDownloader {
    fn name(&self) -> &'static str {
        "none"
    }

    fn download(&self, _package: &PackageSpec, _dir: &Path) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Copies `<source-directory>/<package>` into the work directory
#[derive(Debug)]
pub struct LocalDownloader {
    source_directory: PathBuf,
}

impl LocalDownloader {
    pub fn new(source_directory: PathBuf) -> Self {
        Self { source_directory }
    }
}

impl Downloader for LocalDownloader {
    fn name(&self) -> &'static str {
        "local"
    }

    fn download(&self, package: &PackageSpec, dir: &Path) -> Result<(), BackendError> {
        let source = self.source_directory.join(&package.name);
        if !source.is_dir() {
            return Err(BackendError::DownloadFailed {
                package: package.name.clone(),
                reason: format!("no source tree at {}", source.display()),
            });
        }
        copy_tree(&source, dir)
    }
}

/// Clones `<base-url>/<package>` into the work directory
#[derive(Debug)]
pub struct GitDownloader {
    base_url: String,
    branch: Option<String>,
}

impl GitDownloader {
    pub fn new(base_url: String, branch: Option<String>) -> Self {
        Self { base_url, branch }
    }

    fn package_url(&self, package: &str) -> String {
        format!("{}/{package}.git", self.base_url.trim_end_matches('/'))
    }
}

impl Downloader for GitDownloader {
    fn name(&self) -> &'static str {
        "git"
    }

    fn download(&self, package: &PackageSpec, dir: &Path) -> Result<(), BackendError> {
        let url = self.package_url(&package.name);
        tracing::info!(package = %package.name, url = %url, "cloning");
        clone_package(&package.name, &url, self.branch.as_deref(), dir)
    }
}

/// Runs the shell commands listed under `download:` in the custom file,
/// once per package, inside the package's work directory.
#[derive(Debug)]
pub struct CustomDownloader {
    custom: CustomFile,
}

impl CustomDownloader {
    pub fn new(custom: CustomFile) -> Self {
        Self { custom }
    }
}

impl Downloader for CustomDownloader {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn download(&self, package: &PackageSpec, dir: &Path) -> Result<(), BackendError> {
        for command in &self.custom.download {
            run_shell(&package.name, command, dir, &self.custom.env)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::recipe::PackageSpec;
    use tempfile::TempDir;

    fn pkg(name: &str) -> PackageSpec {
        PackageSpec::bare(name, "test")
    }

    #[test]
    fn test_none_downloader_has_no_side_effects() {
        let tmp = TempDir::new().unwrap();
        NoneDownloader.download(&pkg("a"), tmp.path()).unwrap();
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_local_downloader_copies_source_tree() {
        let source = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        std::fs::create_dir_all(source.path().join("ruby/subdir")).unwrap();
        std::fs::write(source.path().join("ruby/ruby.spec"), "Name: ruby\n").unwrap();
        std::fs::write(source.path().join("ruby/subdir/patch"), "x").unwrap();

        let downloader = LocalDownloader::new(source.path().to_path_buf());
        downloader.download(&pkg("ruby"), work.path()).unwrap();

        assert!(work.path().join("ruby.spec").is_file());
        assert!(work.path().join("subdir/patch").is_file());
    }

    #[test]
    fn test_local_downloader_missing_source_fails() {
        let source = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();

        let downloader = LocalDownloader::new(source.path().to_path_buf());
        let err = downloader.download(&pkg("ruby"), work.path()).unwrap_err();
        assert!(matches!(err, BackendError::DownloadFailed { .. }));
    }

    #[test]
    fn test_git_downloader_url_layout() {
        let downloader = GitDownloader::new("https://src.example.org/rpms/".to_string(), None);
        assert_eq!(
            downloader.package_url("python3"),
            "https://src.example.org/rpms/python3.git"
        );
    }

    #[test]
    fn test_custom_downloader_runs_commands_in_work_dir() {
        let work = TempDir::new().unwrap();
        let custom = CustomFile {
            download: vec!["touch downloaded-$PKG".to_string()],
            build: Vec::new(),
            env: Default::default(),
        };

        CustomDownloader::new(custom)
            .download(&pkg("ruby"), work.path())
            .unwrap();

        assert!(work.path().join("downloaded-ruby").is_file());
    }

    #[test]
    fn test_custom_downloader_failing_command() {
        let work = TempDir::new().unwrap();
        let custom = CustomFile {
            download: vec!["false".to_string()],
            build: Vec::new(),
            env: Default::default(),
        };

        let err = CustomDownloader::new(custom)
            .download(&pkg("ruby"), work.path())
            .unwrap_err();
        assert!(matches!(err, BackendError::CommandFailed { .. }));
    }
}
