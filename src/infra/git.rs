//! Git clone support for the `git` downloader
//!
//! Uses the gix crate: shallow clone of the package repository into a
//! subdirectory of the package's work directory, optionally at a specific
//! branch.

use std::path::Path;

use gix::remote::fetch::Shallow;

use crate::error::BackendError;

/// Clone `url` into `<dest>/<package>`, replacing any previous clone.
///
/// A re-download after a failed run starts from fresh sources, so an
/// existing clone is removed first.
pub fn clone_package(
    package: &str,
    url: &str,
    branch: Option<&str>,
    dest: &Path,
) -> Result<(), BackendError> {
    let target = dest.join(package);
    if target.exists() {
        std::fs::remove_dir_all(&target).map_err(|e| BackendError::IoError {
            path: target.clone(),
            error: e.to_string(),
        })?;
    }

    let clone_err = |e: String| BackendError::DownloadFailed {
        package: package.to_string(),
        reason: format!("clone of {url} failed: {e}"),
    };

    let mut prepare = gix::prepare_clone(url, &target)
        .map_err(|e| clone_err(e.to_string()))?
        .with_shallow(Shallow::DepthAtRemote(1.try_into().unwrap()));

    if let Some(branch) = branch {
        prepare = prepare
            .with_ref_name(Some(branch))
            .map_err(|e| clone_err(format!("invalid branch '{branch}': {e}")))?;
    }

    let (mut checkout, _outcome) = prepare
        .fetch_then_checkout(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
        .map_err(|e| clone_err(e.to_string()))?;

    let (_repo, _outcome) = checkout
        .main_worktree(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
        .map_err(|e| clone_err(e.to_string()))?;

    Ok(())
}
