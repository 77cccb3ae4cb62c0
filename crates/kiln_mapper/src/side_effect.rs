//! Declarative side effects emitted by mappers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Whether a file or directory should exist after the effect is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideEffectState {
    /// Create or overwrite.
    Present,
    /// Remove if it exists.
    Absent,
}

/// A file to write or delete.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Absolute file path.
    pub path: PathBuf,
    /// Contents to write; an empty file when `None`.
    #[serde(default)]
    pub contents: Option<Vec<u8>>,
    /// Desired state.
    pub state: SideEffectState,
}

/// A directory to create or delete.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectoryDescriptor {
    /// Absolute directory path.
    pub path: PathBuf,
    /// Desired state.
    pub state: SideEffectState,
}

/// A command to run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandDescriptor {
    /// Program followed by its arguments.
    pub argv: Vec<String>,
}

/// A deferred action on the filesystem or the process table.
///
/// Mappers only describe effects; a
/// [`SideEffectExecutor`](crate::SideEffectExecutor) applies them later, in
/// the order they were emitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SideEffectDescriptor {
    /// Write or delete a file.
    File(FileDescriptor),
    /// Create or delete a directory.
    Directory(DirectoryDescriptor),
    /// Run a command.
    Command(CommandDescriptor),
}

impl SideEffectDescriptor {
    /// A file that should exist with the given contents.
    pub fn write_file(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        SideEffectDescriptor::File(FileDescriptor {
            path: path.into(),
            contents: Some(contents.into()),
            state: SideEffectState::Present,
        })
    }

    /// A directory that should not exist.
    pub fn remove_directory(path: impl Into<PathBuf>) -> Self {
        SideEffectDescriptor::Directory(DirectoryDescriptor {
            path: path.into(),
            state: SideEffectState::Absent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shape_is_tagged() {
        let effect = SideEffectDescriptor::remove_directory("/p/Derived");
        let json = serde_json::to_string(&effect).unwrap();
        assert_eq!(json, r#"{"type":"directory","path":"/p/Derived","state":"absent"}"#);
        let back: SideEffectDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, effect);
    }

    #[test]
    fn equal_descriptors_compare_equal() {
        let a = SideEffectDescriptor::write_file("/p/a.swift", "let a = 1");
        let b = SideEffectDescriptor::write_file("/p/a.swift", "let a = 1");
        assert_eq!(a, b);
        assert_ne!(a, SideEffectDescriptor::write_file("/p/a.swift", "let a = 2"));
    }
}
