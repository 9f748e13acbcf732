//! Joining paths under an engine root.
//!
//! The engine writes every cached output and reads every file input under
//! one root directory (§6 of the expanded spec). `RootPath` canonicalizes
//! that root once and resolves everything else relative to it, so callers
//! never have to reason about the current working directory again.

use camino::{Utf8Path, Utf8PathBuf};
use std::io;

/// The canonical root an engine instance is operating under.
#[derive(Debug, Clone)]
pub struct RootPath {
    root: Utf8PathBuf,
}

impl RootPath {
    /// Use `root` as the engine root, creating it if it doesn't exist yet.
    pub fn new(root: impl Into<Utf8PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let canonical = root.canonicalize_utf8()?;
        Ok(Self { root: canonical })
    }

    /// Use the current working directory as the engine root.
    pub fn cwd() -> io::Result<Self> {
        let cwd = std::env::current_dir()?;
        let cwd = Utf8PathBuf::from_path_buf(cwd)
            .map_err(|p| io::Error::other(format!("root path is not valid UTF-8: {}", p.display())))?;
        Self::new(cwd)
    }

    pub fn as_path(&self) -> &Utf8Path {
        &self.root
    }

    /// Join a relative path segment onto this root. The result is not
    /// required to exist yet; callers create parent directories on write.
    pub fn join(&self, rel: impl AsRef<Utf8Path>) -> Utf8PathBuf {
        self.root.join(rel.as_ref())
    }

    /// Path to the metadata store file: `<root>/.cex/cex.json`.
    pub fn meta_store_path(&self) -> Utf8PathBuf {
        self.root.join(".cex").join("cex.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_relative_to_canonical_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = RootPath::new(Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap())
            .unwrap();
        let joined = root.join("a/b");
        assert!(joined.as_str().ends_with("a/b"));
    }

    #[test]
    fn meta_store_path_is_dot_cex() {
        let dir = tempfile::tempdir().unwrap();
        let root = RootPath::new(Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap())
            .unwrap();
        assert!(root.meta_store_path().as_str().ends_with(".cex/cex.json"));
    }
}
