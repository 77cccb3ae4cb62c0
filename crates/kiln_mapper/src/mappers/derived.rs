use kiln_graph::Project;

use crate::error::MapperError;
use crate::mapper::{Mapped, ProjectMapper};
use crate::side_effect::SideEffectDescriptor;

/// Removes the project's derived directory so stale generated files never
/// survive a regeneration.
///
/// Register it before mappers that write into the derived directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeleteDerivedDirectoryProjectMapper;

impl ProjectMapper for DeleteDerivedDirectoryProjectMapper {
    fn name(&self) -> &str {
        "delete-derived-directory"
    }

    fn map(&self, project: Project) -> Result<Mapped<Project>, MapperError> {
        let effect = SideEffectDescriptor::remove_directory(project.derived_directory());
        Ok((project, vec![effect]))
    }
}
