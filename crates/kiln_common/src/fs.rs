//! Filesystem seam used by hashing, side-effect execution and the cache.

use std::io;
use std::path::{Path, PathBuf};

/// The filesystem operations kiln needs.
///
/// Injected into hashers so tests can substitute deterministic or
/// adversarial implementations (for example one that lists directory entries
/// in a different order).
pub trait FileSystem: Send + Sync {
    /// Returns `true` if something exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Returns `true` if `path` is a directory.
    fn is_directory(&self, path: &Path) -> bool;

    /// Lists the entries of a directory as full paths, in no particular order.
    fn contents_of_directory(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Reads a file's raw bytes.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Writes a file, creating parent directories as needed.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Creates a directory and its parents.
    fn create_directory(&self, path: &Path) -> io::Result<()>;

    /// Removes a file or directory tree. Missing paths are not an error.
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn contents_of_directory(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)
    }

    fn create_directory(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let result = if path.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        match result {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
