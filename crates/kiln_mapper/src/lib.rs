//! Graph mapper pipeline.
//!
//! Mappers are pure transformations over [`Project`](kiln_graph::Project),
//! [`WorkspaceWithProjects`](kiln_graph::WorkspaceWithProjects) and
//! [`Graph`](kiln_graph::Graph) values. Instead of touching the filesystem
//! they return [`SideEffectDescriptor`]s, which a [`SideEffectExecutor`]
//! applies afterwards.

#![warn(missing_docs)]

pub mod error;
pub mod executor;
pub mod mapper;
pub mod mappers;
pub mod side_effect;

pub use error::{MapperError, SideEffectError};
pub use executor::SideEffectExecutor;
pub use mapper::{
    GraphMapper, Mapped, ProjectMapper, ProjectWorkspaceMapper, SequentialGraphMapper,
    SequentialProjectMapper, SequentialWorkspaceMapper, WorkspaceMapper,
};
pub use mappers::{
    DeleteDerivedDirectoryProjectMapper, PruneTargetsGraphMapper, ResourcesProjectMapper,
};
pub use side_effect::{
    CommandDescriptor, DirectoryDescriptor, FileDescriptor, SideEffectDescriptor, SideEffectState,
};
