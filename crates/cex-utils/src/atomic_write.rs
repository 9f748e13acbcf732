//! Atomic file writes: temp file in the target directory, fsync, rename.
//!
//! Single-writer model only (see the engine's concurrency notes). No
//! Windows rename-retry loop or cross-filesystem fallback is needed because
//! the metadata store always lives on the same filesystem as the engine
//! root it was opened under.

use camino::Utf8Path;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

use crate::error::MetaStoreError;

/// Atomically write `content` to `path`, creating parent directories as needed.
pub fn write_file_atomic(path: &Utf8Path, content: &str) -> Result<(), MetaStoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| MetaStoreError::Write {
            path: path.to_string(),
            source,
        })?;
    }

    let temp_dir = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let mut temp_file = NamedTempFile::new_in(temp_dir).map_err(|source| MetaStoreError::Write {
        path: path.to_string(),
        source,
    })?;

    temp_file
        .write_all(content.as_bytes())
        .map_err(|source| MetaStoreError::Write {
            path: path.to_string(),
            source,
        })?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|source| MetaStoreError::Write {
            path: path.to_string(),
            source,
        })?;

    temp_file
        .persist(path.as_std_path())
        .map_err(|e| MetaStoreError::Write {
            path: path.to_string(),
            source: e.error,
        })?;

    Ok(())
}
