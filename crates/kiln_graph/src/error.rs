//! Error types for graph construction.

use std::path::PathBuf;

use kiln_common::{ErrorKind, FatalError};

/// Errors raised while building a [`Graph`](crate::Graph).
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A target dependency references a target that no loaded project declares.
    #[error("target '{from}' depends on '{target}' in {path}, which does not exist")]
    UnknownTarget {
        /// Name of the depending target.
        from: String,
        /// Name of the missing target.
        target: String,
        /// Project path where the missing target was looked up.
        path: PathBuf,
    },

    /// Two projects were loaded from the same path.
    #[error("project at {path} was loaded twice")]
    DuplicateProject {
        /// The duplicated project path.
        path: PathBuf,
    },

    /// A project declares two targets with the same name.
    #[error("project at {path} declares target '{name}' more than once")]
    DuplicateTarget {
        /// Project path.
        path: PathBuf,
        /// Duplicated target name.
        name: String,
    },

    /// The target dependency edges contain a cycle.
    #[error("dependency cycle detected: {}", cycle.join(" -> "))]
    CycleDetected {
        /// Names of the targets participating in the cycle, sorted.
        cycle: Vec<String>,
    },
}

impl FatalError for GraphError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Abort
    }
}
