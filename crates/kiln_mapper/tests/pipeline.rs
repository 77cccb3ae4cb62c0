//! Built-in mappers composed and executed against a temporary directory.

use kiln_common::ContentHash;
use kiln_graph::{Product, Project, ResourceFile, SourceFile, Target};
use kiln_mapper::{
    DeleteDerivedDirectoryProjectMapper, ProjectMapper, ResourcesProjectMapper,
    SequentialProjectMapper, SideEffectExecutor,
};

fn project(root: &std::path::Path) -> Project {
    std::fs::create_dir_all(root.join("Sources")).unwrap();
    std::fs::write(root.join("Sources/Core.swift"), "public enum Core {}").unwrap();
    let core = Target {
        sources: vec![SourceFile::new(root.join("Sources/Core.swift"))],
        resources: vec![ResourceFile::new(root.join("Resources/logo.png"))],
        ..Target::new("Core", Product::StaticFramework)
    };
    Project::new(root, "App", vec![core])
}

#[test]
fn delete_then_generate_leaves_accessor_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let stale = dir.path().join("Derived/Sources/Old.swift");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, "stale").unwrap();

    let pipeline = SequentialProjectMapper::new(vec![
        Box::new(DeleteDerivedDirectoryProjectMapper),
        Box::new(ResourcesProjectMapper),
    ]);
    let (mapped, effects) = pipeline.map(project(dir.path())).unwrap();
    SideEffectExecutor::default().execute(&effects).unwrap();

    assert!(!stale.exists());
    let accessor = mapped.targets[0].sources.last().unwrap();
    let on_disk = std::fs::read(&accessor.path).unwrap();
    assert_eq!(accessor.content_hash, Some(ContentHash::from_bytes(&on_disk)));
}

#[test]
fn generate_then_delete_removes_accessor() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = SequentialProjectMapper::new(vec![
        Box::new(ResourcesProjectMapper),
        Box::new(DeleteDerivedDirectoryProjectMapper),
    ]);
    let (mapped, effects) = pipeline.map(project(dir.path())).unwrap();
    SideEffectExecutor::default().execute(&effects).unwrap();

    let accessor = &mapped.targets[0].sources.last().unwrap().path;
    assert!(!accessor.exists());
}
