//! Builder backends
//!
//! - `dummy`: no-op, always succeeds (the default)
//! - `mock`: chroot build via the external `mock` tool
//! - `custom`: runs the `build:` command list from the custom file

use std::collections::BTreeMap;
use std::path::Path;

use crate::backend::{Builder, CustomFile};
use crate::core::recipe::PackageSpec;
use crate::error::{BackendError, ConfigError};
use crate::infra::process::run_shell;

/// No-op builder; exercises the orchestration without real builds
#[derive(Debug)]
pub struct DummyBuilder;

impl Builder for DummyBuilder {
    fn name(&self) -> &'static str {
        "dummy"
    }

    fn build(&self, _package: &PackageSpec, _dir: &Path) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Builds the package in a mock chroot: SRPM from the spec file and
/// sources in the work directory, then a rebuild of that SRPM.
#[derive(Debug)]
pub struct MockBuilder {
    env: BTreeMap<String, String>,
}

impl MockBuilder {
    /// Fails at startup when `mock` is not on PATH
    pub fn new() -> Result<Self, ConfigError> {
        which::which("mock").map_err(|_| ConfigError::ToolNotFound {
            backend: "mock".to_string(),
            tool: "mock".to_string(),
        })?;
        Ok(Self {
            env: BTreeMap::new(),
        })
    }
}

impl Builder for MockBuilder {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn build(&self, package: &PackageSpec, dir: &Path) -> Result<(), BackendError> {
        let Some(spec_path) = crate::core::specfile::locate_spec(dir, &package.name) else {
            return Err(BackendError::BuildFailed {
                package: package.name.clone(),
                reason: format!("no {}.spec in work directory", package.name),
            });
        };
        // Run next to the spec so `--sources .` picks up the tarballs.
        let cwd = spec_path.parent().unwrap_or(dir);
        let spec = format!("{}.spec", package.name);

        run_shell(
            &package.name,
            &format!("mock --buildsrpm --spec {spec} --sources . --resultdir result"),
            cwd,
            &self.env,
        )?;
        run_shell(
            &package.name,
            "mock --rebuild --resultdir result result/*.src.rpm",
            cwd,
            &self.env,
        )
    }
}

/// Runs the shell commands listed under `build:` in the custom file,
/// once per package, inside the package's work directory.
#[derive(Debug)]
pub struct CustomBuilder {
    custom: CustomFile,
}

impl CustomBuilder {
    pub fn new(custom: CustomFile) -> Self {
        Self { custom }
    }
}

impl Builder for CustomBuilder {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn build(&self, package: &PackageSpec, dir: &Path) -> Result<(), BackendError> {
        for command in &self.custom.build {
            run_shell(&package.name, command, dir, &self.custom.env)?;
        }
        Ok(())
    }
}
