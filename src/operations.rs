//! Filesystem operation abstractions for dependency injection.
//!
//! Provides the [`FileSystemOps`] trait so the runner can be unit-tested
//! without touching the real filesystem. Production code uses
//! [`SystemFileSystemOps`]; tests use `MockFileSystemOps`.

use std::path::{Path, PathBuf};

/// Abstraction over the filesystem operations the runner needs.
pub trait FileSystemOps: Send + Sync + std::fmt::Debug {
    /// Returns `true` if `path` exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;

    /// Read the entire file at `path` as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;

    /// Create `path` and all missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;
}

/// Production [`FileSystemOps`] implementation that delegates to [`std::fs`].
#[derive(Debug, Default)]
pub struct SystemFileSystemOps;

impl FileSystemOps for SystemFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(path)
    }
}

/// Mock [`FileSystemOps`] for unit tests.
///
/// Pre-configure file contents with the builder-style methods, then pass
/// `Arc::new(mock)` wherever a [`FileSystemOps`] is accepted. Directory
/// creations are recorded and can be asserted on.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockFileSystemOps {
    files: std::collections::HashMap<PathBuf, String>,
    created: std::sync::Mutex<Vec<PathBuf>>,
}

#[cfg(test)]
impl MockFileSystemOps {
    /// Create an empty mock with nothing configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file with the given contents (also marks it as existing).
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }

    /// Paths passed to `create_dir_all`, in call order.
    pub fn created_dirs(&self) -> Vec<PathBuf> {
        self.created
            .lock()
            .map_or_else(|_| Vec::new(), |g| g.clone())
    }
}

#[cfg(test)]
impl FileSystemOps for MockFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such mocked file")
        })
    }

    fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        if let Ok(mut created) = self.created.lock() {
            created.push(path.to_path_buf());
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn mock_serves_registered_file() {
        let fs = MockFileSystemOps::new().with_file("/x/settings.json", "{}");
        assert!(fs.exists(Path::new("/x/settings.json")));
        assert_eq!(
            fs.read_to_string(Path::new("/x/settings.json")).unwrap(),
            "{}"
        );
    }

    #[test]
    fn mock_missing_file_is_not_found() {
        let fs = MockFileSystemOps::new();
        assert!(!fs.exists(Path::new("/missing")));
        let err = fs.read_to_string(Path::new("/missing")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn mock_records_created_dirs() {
        let fs = MockFileSystemOps::new();
        fs.create_dir_all(Path::new("/build/debug")).unwrap();
        assert_eq!(fs.created_dirs(), vec![PathBuf::from("/build/debug")]);
    }

    #[test]
    fn system_fs_reads_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "contents").unwrap();
        let fs = SystemFileSystemOps;
        assert!(fs.exists(&path));
        assert_eq!(fs.read_to_string(&path).unwrap(), "contents");
    }
}
