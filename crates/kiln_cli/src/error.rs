//! Errors surfaced by CLI commands.

use std::path::PathBuf;

use kiln_cache::CacheError;
use kiln_common::{ErrorKind, FatalError};
use kiln_config::ConfigError;
use kiln_graph::GraphError;
use kiln_hasher::HashError;
use kiln_mapper::MapperError;

/// Any failure of a CLI command.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The graph file could not be read.
    #[error("failed to read graph file {path}: {source}")]
    ReadGraph {
        /// The graph file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The graph file is not a valid graph manifest.
    #[error("invalid graph file {path}: {source}")]
    ParseGraph {
        /// The graph file.
        path: PathBuf,
        /// The JSON error.
        source: serde_json::Error,
    },

    /// The current directory is unavailable.
    #[error("cannot determine the current directory: {0}")]
    CurrentDir(std::io::Error),

    /// Rendering JSON output failed.
    #[error("failed to render JSON output: {0}")]
    Render(serde_json::Error),

    /// Graph validation failed.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A graph mapper failed.
    #[error(transparent)]
    Mapper(#[from] MapperError),

    /// Hashing failed.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// Configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A cache operation failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl FatalError for CliError {
    fn kind(&self) -> ErrorKind {
        match self {
            CliError::Render(_) => ErrorKind::Bug,
            CliError::Graph(e) => e.kind(),
            CliError::Mapper(e) => e.kind(),
            CliError::Hash(e) => e.kind(),
            CliError::Config(e) => e.kind(),
            CliError::Cache(e) => e.kind(),
            _ => ErrorKind::Abort,
        }
    }
}
