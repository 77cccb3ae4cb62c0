//! Built-in mappers.

mod derived;
mod prune;
mod resources;

pub use derived::DeleteDerivedDirectoryProjectMapper;
pub use prune::PruneTargetsGraphMapper;
pub use resources::ResourcesProjectMapper;
