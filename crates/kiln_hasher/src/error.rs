//! Error types for content hashing.

use std::path::PathBuf;

use kiln_common::{ErrorKind, FatalError};

/// Errors raised while hashing.
///
/// Every error is fatal for the hashing run: a partial set of hashes must
/// never be used for cache decisions.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// A file or directory that participates in a hash does not exist.
    #[error("file not found: {path}")]
    FileNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// A file or directory exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The unreadable path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A string could not be represented as UTF-8.
    #[error("cannot hash non UTF-8 string {lossy:?}")]
    Encoding {
        /// Lossy rendering of the offending value.
        lossy: String,
    },

    /// Hashing a specific target failed.
    #[error("failed to hash target '{target}' in {project}: {source}")]
    Target {
        /// Target name.
        target: String,
        /// Project path of the target.
        project: PathBuf,
        /// The underlying failure.
        #[source]
        source: Box<HashError>,
    },

    /// The target to hash is not part of the graph.
    #[error("target '{target}' is not part of the graph (project {project})")]
    UnknownTarget {
        /// Target name.
        target: String,
        /// Project path that was searched.
        project: PathBuf,
    },

    /// A dependency was visited before its own hash was computed.
    #[error("internal error: hash of dependency '{dependency}' was not computed before '{target}'")]
    MissingDependencyHash {
        /// The dependent target.
        target: String,
        /// The dependency whose hash is missing.
        dependency: String,
    },

    /// The worker pool could not be created.
    #[error("failed to start hashing workers: {reason}")]
    WorkerPool {
        /// Description of the failure.
        reason: String,
    },
}

impl FatalError for HashError {
    fn kind(&self) -> ErrorKind {
        match self {
            HashError::MissingDependencyHash { .. } | HashError::WorkerPool { .. } => {
                ErrorKind::Bug
            }
            HashError::Target { source, .. } => source.kind(),
            _ => ErrorKind::Abort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_error_names_target_and_path() {
        let err = HashError::Target {
            target: "Core".into(),
            project: PathBuf::from("/work/App"),
            source: Box::new(HashError::FileNotFound {
                path: PathBuf::from("/work/App/Sources/a.swift"),
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("'Core'"));
        assert!(msg.contains("/work/App/Sources/a.swift"));
        assert_eq!(err.kind(), ErrorKind::Abort);
    }

    #[test]
    fn missing_dependency_hash_is_a_bug() {
        let err = HashError::Target {
            target: "App".into(),
            project: PathBuf::from("/p"),
            source: Box::new(HashError::MissingDependencyHash {
                target: "App".into(),
                dependency: "Core".into(),
            }),
        };
        assert_eq!(err.kind(), ErrorKind::Bug);
    }
}
