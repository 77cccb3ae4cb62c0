//! Error types for mapping and side-effect execution.

use std::path::PathBuf;

use kiln_common::{ErrorKind, FatalError};
use kiln_graph::GraphError;

/// A mapper failed. Aborts the whole pipeline.
#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    /// Rebuilding the graph after a transformation failed validation.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A mapper rejected its input.
    #[error("mapper '{mapper}' failed for {path}: {reason}")]
    Failed {
        /// Name of the failing mapper.
        mapper: String,
        /// Project or workspace being mapped.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },
}

impl FatalError for MapperError {
    fn kind(&self) -> ErrorKind {
        match self {
            MapperError::Graph(inner) => inner.kind(),
            MapperError::Failed { .. } => ErrorKind::Abort,
        }
    }
}

/// Applying a side effect failed.
#[derive(Debug, thiserror::Error)]
pub enum SideEffectError {
    /// A filesystem operation failed.
    #[error("failed to update {path}: {source}")]
    Io {
        /// The affected path.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// A command descriptor had no program.
    #[error("command side effect has an empty argument list")]
    EmptyCommand,

    /// A command could not be started.
    #[error("failed to run '{program}': {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// The underlying error.
        source: std::io::Error,
    },

    /// A command exited unsuccessfully.
    #[error("command '{command}' exited with {status}")]
    CommandFailed {
        /// The full command line.
        command: String,
        /// Exit status description.
        status: String,
    },
}

impl FatalError for SideEffectError {
    fn kind(&self) -> ErrorKind {
        match self {
            SideEffectError::EmptyCommand => ErrorKind::Bug,
            _ => ErrorKind::Abort,
        }
    }
}
