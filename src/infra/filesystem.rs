//! Filesystem helpers

use std::path::Path;

use crate::error::BackendError;

/// Recursively copy the contents of `source` into `dest`.
///
/// `dest` must already exist; existing files are overwritten. Symlinks are
/// not followed specially and copy as their target's content.
pub fn copy_tree(source: &Path, dest: &Path) -> Result<(), BackendError> {
    let entries = std::fs::read_dir(source).map_err(|e| BackendError::IoError {
        path: source.to_path_buf(),
        error: e.to_string(),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| BackendError::IoError {
            path: source.to_path_buf(),
            error: e.to_string(),
        })?;
        let target = dest.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| BackendError::IoError {
            path: entry.path(),
            error: e.to_string(),
        })?;

        if file_type.is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| BackendError::IoError {
                path: target.clone(),
                error: e.to_string(),
            })?;
            copy_tree(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(|e| BackendError::IoError {
                path: target.clone(),
                error: e.to_string(),
            })?;
        }
    }
    Ok(())
}
