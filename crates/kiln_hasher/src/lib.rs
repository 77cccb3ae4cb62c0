//! Content hashing for cacheable targets.
//!
//! The [`ContentHasher`] provides the primitive digests (bytes, strings,
//! string lists, dictionaries, files and directories). The [`files`] and
//! [`settings`] modules compose those into per-fragment digests, and
//! [`GraphContentHasher`] combines fragments into the cache key of every
//! cacheable target in a [`Graph`](kiln_graph::Graph).

#![warn(missing_docs)]

pub mod content;
pub mod error;
pub mod files;
pub mod graph;
pub mod settings;
pub mod target;

pub use content::ContentHasher;
pub use error::HashError;
pub use kiln_common::fs::{FileSystem, LocalFileSystem};
pub use graph::GraphContentHasher;
pub use target::{TargetContentHash, TargetContentHasher, TargetSubhashes};
