//! Mapper traits and their compositions.
//!
//! A mapper takes a value by ownership and returns the transformed value and
//! the side effects it wants applied. Compositions thread the value through
//! their mappers in registration order and concatenate the side effects
//! without deduplicating or reordering them. The first failure aborts the
//! composition and its partial output is discarded.

use kiln_graph::{Graph, Project, WorkspaceWithProjects};
use rayon::prelude::*;

use crate::error::MapperError;
use crate::side_effect::SideEffectDescriptor;

/// Output of every mapper: the transformed value and its side effects.
pub type Mapped<T> = (T, Vec<SideEffectDescriptor>);

/// Transforms a single project.
pub trait ProjectMapper: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Maps the project.
    fn map(&self, project: Project) -> Result<Mapped<Project>, MapperError>;
}

/// Transforms a workspace together with its projects.
pub trait WorkspaceMapper: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Maps the workspace.
    fn map(
        &self,
        workspace: WorkspaceWithProjects,
    ) -> Result<Mapped<WorkspaceWithProjects>, MapperError>;
}

/// Transforms a resolved graph.
pub trait GraphMapper: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Maps the graph.
    fn map(&self, graph: Graph) -> Result<Mapped<Graph>, MapperError>;
}

macro_rules! sequential_mapper {
    ($(#[$doc:meta])* $name:ident, $trait:ident, $value:ty) => {
        $(#[$doc])*
        #[derive(Default)]
        pub struct $name {
            mappers: Vec<Box<dyn $trait>>,
        }

        impl $name {
            /// Creates a composition running `mappers` in order.
            pub fn new(mappers: Vec<Box<dyn $trait>>) -> Self {
                Self { mappers }
            }

            /// Appends a mapper to the end of the composition.
            pub fn register(&mut self, mapper: Box<dyn $trait>) {
                self.mappers.push(mapper);
            }

            /// Number of registered mappers.
            pub fn len(&self) -> usize {
                self.mappers.len()
            }

            /// Returns `true` if no mapper is registered.
            pub fn is_empty(&self) -> bool {
                self.mappers.is_empty()
            }
        }

        impl $trait for $name {
            fn name(&self) -> &str {
                stringify!($name)
            }

            fn map(&self, value: $value) -> Result<Mapped<$value>, MapperError> {
                let mut value = value;
                let mut side_effects = Vec::new();
                for mapper in &self.mappers {
                    let (mapped, effects) = mapper.map(value)?;
                    tracing::trace!(
                        mapper = mapper.name(),
                        side_effects = effects.len(),
                        "mapper applied"
                    );
                    value = mapped;
                    side_effects.extend(effects);
                }
                Ok((value, side_effects))
            }
        }
    };
}

sequential_mapper!(
    /// Runs project mappers one after another.
    SequentialProjectMapper,
    ProjectMapper,
    Project
);

sequential_mapper!(
    /// Runs workspace mappers one after another.
    SequentialWorkspaceMapper,
    WorkspaceMapper,
    WorkspaceWithProjects
);

sequential_mapper!(
    /// Runs graph mappers one after another.
    SequentialGraphMapper,
    GraphMapper,
    Graph
);

/// Applies a project mapper to every project of a workspace.
///
/// Projects are mapped in parallel; results are merged in workspace project
/// order, so the side-effect list is the same as for a sequential run. When
/// several projects fail, the error of the first failing project in that
/// order is returned.
pub struct ProjectWorkspaceMapper {
    mapper: Box<dyn ProjectMapper>,
}

impl ProjectWorkspaceMapper {
    /// Lifts `mapper` to the workspace level.
    pub fn new(mapper: Box<dyn ProjectMapper>) -> Self {
        Self { mapper }
    }
}

impl WorkspaceMapper for ProjectWorkspaceMapper {
    fn name(&self) -> &str {
        self.mapper.name()
    }

    fn map(
        &self,
        workspace: WorkspaceWithProjects,
    ) -> Result<Mapped<WorkspaceWithProjects>, MapperError> {
        let WorkspaceWithProjects { workspace, projects } = workspace;
        let results: Vec<Result<Mapped<Project>, MapperError>> = projects
            .into_par_iter()
            .map(|project| self.mapper.map(project))
            .collect();

        let mut mapped_projects = Vec::with_capacity(results.len());
        let mut side_effects = Vec::new();
        for result in results {
            let (project, effects) = result?;
            mapped_projects.push(project);
            side_effects.extend(effects);
        }
        Ok((
            WorkspaceWithProjects {
                workspace,
                projects: mapped_projects,
            },
            side_effects,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_graph::{Product, Target, Workspace};
    use std::path::PathBuf;

    /// Appends a suffix to every target name and records a file per project.
    struct Suffix(&'static str);

    impl ProjectMapper for Suffix {
        fn name(&self) -> &str {
            "suffix"
        }

        fn map(&self, mut project: Project) -> Result<Mapped<Project>, MapperError> {
            for target in &mut project.targets {
                target.name.push_str(self.0);
            }
            let effect = SideEffectDescriptor::write_file(project.path.join(self.0), self.0);
            Ok((project, vec![effect]))
        }
    }

    /// Uppercases target names.
    struct Upper;

    impl ProjectMapper for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn map(&self, mut project: Project) -> Result<Mapped<Project>, MapperError> {
            for target in &mut project.targets {
                target.name = target.name.to_uppercase();
            }
            let effect = SideEffectDescriptor::remove_directory(project.derived_directory());
            Ok((project, vec![effect]))
        }
    }

    /// Fails for projects whose name starts with `Bad`.
    struct RejectBad;

    impl ProjectMapper for RejectBad {
        fn name(&self) -> &str {
            "reject-bad"
        }

        fn map(&self, project: Project) -> Result<Mapped<Project>, MapperError> {
            if project.name.starts_with("Bad") {
                return Err(MapperError::Failed {
                    mapper: self.name().into(),
                    path: project.path.clone(),
                    reason: format!("{} is rejected", project.name),
                });
            }
            Ok((project, Vec::new()))
        }
    }

    fn project(name: &str) -> Project {
        Project::new(
            format!("/w/{name}"),
            name,
            vec![Target::new("core", Product::Framework)],
        )
    }

    fn workspace(names: &[&str]) -> WorkspaceWithProjects {
        WorkspaceWithProjects {
            workspace: Workspace {
                path: PathBuf::from("/w"),
                name: "W".into(),
                projects: names.iter().map(|n| PathBuf::from(format!("/w/{n}"))).collect(),
            },
            projects: names.iter().map(|n| project(n)).collect(),
        }
    }

    #[test]
    fn composition_order_matters() {
        let ab = SequentialProjectMapper::new(vec![Box::new(Suffix("_x")), Box::new(Upper)]);
        let ba = SequentialProjectMapper::new(vec![Box::new(Upper), Box::new(Suffix("_x"))]);
        let (p1, e1) = ab.map(project("App")).unwrap();
        let (p2, e2) = ba.map(project("App")).unwrap();
        assert_eq!(p1.targets[0].name, "CORE_X");
        assert_eq!(p2.targets[0].name, "CORE_x");
        assert_ne!(e1, e2);
    }

    #[test]
    fn side_effects_are_concatenated_in_registration_order() {
        let pipeline = SequentialProjectMapper::new(vec![
            Box::new(Suffix("_a")),
            Box::new(Upper),
            Box::new(Suffix("_b")),
        ]);
        let (_, effects) = pipeline.map(project("App")).unwrap();
        let (_, a) = Suffix("_a").map(project("App")).unwrap();
        let (_, upper) = Upper.map(project("App")).unwrap();
        let (_, b) = Suffix("_b").map(project("App")).unwrap();
        let expected: Vec<_> = a.into_iter().chain(upper).chain(b).collect();
        assert_eq!(effects, expected);
    }

    #[test]
    fn failure_aborts_pipeline() {
        let pipeline =
            SequentialProjectMapper::new(vec![Box::new(Suffix("_a")), Box::new(RejectBad)]);
        assert!(pipeline.map(project("BadApp")).is_err());
    }

    #[test]
    fn empty_composition_is_identity() {
        let pipeline = SequentialProjectMapper::default();
        assert!(pipeline.is_empty());
        let (mapped, effects) = pipeline.map(project("App")).unwrap();
        assert_eq!(mapped, project("App"));
        assert!(effects.is_empty());
    }

    #[test]
    fn workspace_lift_preserves_project_order() {
        let names = ["A", "B", "C", "D", "E", "F", "G", "H"];
        let mapper = ProjectWorkspaceMapper::new(Box::new(Suffix("_m")));
        let (mapped, effects) = mapper.map(workspace(&names)).unwrap();
        let mapped_names: Vec<&str> = mapped.projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(mapped_names, names);
        let paths: Vec<PathBuf> = effects
            .iter()
            .map(|e| match e {
                SideEffectDescriptor::File(f) => f.path.clone(),
                other => panic!("unexpected effect {other:?}"),
            })
            .collect();
        let expected: Vec<PathBuf> = names
            .iter()
            .map(|n| PathBuf::from(format!("/w/{n}/_m")))
            .collect();
        assert_eq!(paths, expected);
    }

    #[test]
    fn workspace_lift_reports_first_failing_project() {
        let mapper = ProjectWorkspaceMapper::new(Box::new(RejectBad));
        let err = mapper.map(workspace(&["Good", "BadOne", "BadTwo"])).unwrap_err();
        assert!(err.to_string().contains("BadOne"), "{err}");
    }

    #[test]
    fn sequential_workspace_mapper_threads_value() {
        let pipeline = SequentialWorkspaceMapper::new(vec![
            Box::new(ProjectWorkspaceMapper::new(Box::new(Suffix("_1")))),
            Box::new(ProjectWorkspaceMapper::new(Box::new(Suffix("_2")))),
        ]);
        let (mapped, effects) = pipeline.map(workspace(&["A", "B"])).unwrap();
        assert_eq!(mapped.projects[1].targets[0].name, "core_1_2");
        assert_eq!(effects.len(), 4);
    }
}
