//! Primitive digest functions.
//!
//! Every higher-level hash in kiln bottoms out here. The functions are
//! deterministic across runs and platforms; the only ordering they impose is
//! the one documented per function (dictionaries and directory listings are
//! sorted, string lists are not).

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use kiln_common::fs::{FileSystem, LocalFileSystem};
use kiln_common::ContentHash;

use crate::error::HashError;

/// File names that never participate in directory hashes.
const IGNORED_FILE_NAMES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// Computes content digests and memoizes path hashes for its own lifetime.
///
/// The memo is owned by the instance and never invalidated, so a hasher
/// should live for one run (one invocation) and then be dropped.
pub struct ContentHasher {
    fs: Arc<dyn FileSystem>,
    path_hashes: DashMap<PathBuf, ContentHash>,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new(Arc::new(LocalFileSystem))
    }
}

impl ContentHasher {
    /// Creates a hasher reading through the given filesystem.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            path_hashes: DashMap::new(),
        }
    }

    /// The filesystem this hasher reads from.
    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Hashes raw bytes.
    pub fn hash_bytes(&self, data: &[u8]) -> ContentHash {
        ContentHash::from_bytes(data)
    }

    /// Hashes the UTF-8 encoding of a string.
    pub fn hash_str(&self, text: &str) -> ContentHash {
        ContentHash::from_str_content(text)
    }

    /// Hashes an OS string, failing if it is not valid UTF-8.
    pub fn hash_os_str(&self, text: &OsStr) -> Result<ContentHash, HashError> {
        text.to_str()
            .map(|s| self.hash_str(s))
            .ok_or_else(|| HashError::Encoding {
                lossy: text.to_string_lossy().into_owned(),
            })
    }

    /// Concatenates the strings in the given order and hashes the result.
    ///
    /// This does not sort: callers establish the canonical order.
    pub fn hash_strings<S: AsRef<str>>(&self, items: &[S]) -> ContentHash {
        let joined: String = items.iter().map(AsRef::as_ref).collect();
        self.hash_str(&joined)
    }

    /// Hashes a dictionary independently of insertion order.
    ///
    /// Pairs are sorted by key and rendered as `k1:v1-k2:v2`.
    pub fn hash_dictionary<I, K, V>(&self, entries: I) -> ContentHash
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut pairs: Vec<(K, V)> = entries.into_iter().collect();
        pairs.sort_by(|a, b| a.0.as_ref().cmp(b.0.as_ref()).then(a.1.as_ref().cmp(b.1.as_ref())));
        let canonical = pairs
            .iter()
            .map(|(k, v)| format!("{}:{}", k.as_ref(), v.as_ref()))
            .collect::<Vec<_>>()
            .join("-");
        self.hash_str(&canonical)
    }

    /// Hashes a file's bytes or, for a directory, the sorted hashes of its entries.
    ///
    /// Files are hashed as raw bytes with no text decoding. Directory entries
    /// named in the ignore list are skipped, the rest are sorted by path,
    /// hashed recursively, joined and hashed. Results are memoized per path.
    pub fn hash_path(&self, path: &Path) -> Result<ContentHash, HashError> {
        if let Some(hash) = self.path_hashes.get(path) {
            return Ok(*hash);
        }

        let hash = if self.fs.is_directory(path) {
            let mut entries = self
                .fs
                .contents_of_directory(path)
                .map_err(|source| HashError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            entries.retain(|entry| !is_ignored(entry));
            entries.sort();
            let hashes = entries
                .iter()
                .map(|entry| self.hash_path(entry).map(|h| h.to_string()))
                .collect::<Result<Vec<_>, _>>()?;
            self.hash_strings(&hashes)
        } else {
            if !self.fs.exists(path) {
                return Err(HashError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            let bytes = self.fs.read_file(path).map_err(|source| HashError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            self.hash_bytes(&bytes)
        };

        self.path_hashes.insert(path.to_path_buf(), hash);
        Ok(hash)
    }
}

fn is_ignored(path: &Path) -> bool {
    match path.file_name().and_then(OsStr::to_str) {
        Some(name) => IGNORED_FILE_NAMES.contains(&name) || name.starts_with("._"),
        None => false,
    }
}
