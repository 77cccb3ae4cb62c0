//! The resolved project graph consumed by kiln's mappers and hashers.
//!
//! A [`Graph`] is built once per invocation from fully-loaded [`Project`]
//! values. Construction resolves every [`TargetDependency`] into an index
//! edge and rejects dangling references and cycles, so everything downstream
//! can assume an acyclic, fully-resolved graph.

#![warn(missing_docs)]

pub mod arena;
pub mod error;
pub mod graph;
pub mod ids;
pub mod model;

pub use error::GraphError;
pub use graph::{Graph, GraphDependency, GraphManifest, GraphTarget};
pub use ids::TargetId;
pub use model::*;
