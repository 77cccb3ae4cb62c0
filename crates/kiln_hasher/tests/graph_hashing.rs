//! End-to-end hashing over small on-disk projects.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use kiln_common::{CacheOutputType, CacheProfile, ContentHash};
use kiln_graph::{
    Graph, GraphTarget, Product, Project, SettingValue, SourceFile, Target, TargetDependency,
};
use kiln_hasher::{ContentHasher, GraphContentHasher};

fn write(root: &Path, name: &str, content: &str) {
    std::fs::write(root.join(name), content).unwrap();
}

fn core(root: &Path) -> Target {
    Target {
        sources: vec![
            SourceFile::new(root.join("a.swift")),
            SourceFile::new(root.join("b.swift")),
        ],
        ..Target::new("Core", Product::Framework)
    }
}

fn app() -> Target {
    Target {
        dependencies: vec![TargetDependency::Target {
            name: "Core".into(),
        }],
        ..Target::new("App", Product::App)
    }
}

fn build(root: &Path, targets: Vec<Target>) -> Graph {
    Graph::new("App", root, vec![Project::new(root, "App", targets)]).unwrap()
}

fn hashes(graph: &Graph, output_type: CacheOutputType) -> BTreeMap<GraphTarget, ContentHash> {
    GraphContentHasher::new(Arc::new(ContentHasher::default()))
        .content_hashes(graph, &CacheProfile::new("default", "Debug"), output_type)
        .unwrap()
}

fn setup() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.swift", "public struct A {}");
    write(dir.path(), "b.swift", "public struct B {}");
    dir
}

#[test]
fn only_the_framework_is_hashed() {
    let dir = setup();
    let graph = build(dir.path(), vec![app(), core(dir.path())]);
    let result = hashes(&graph, CacheOutputType::Xcframework);
    let names: Vec<&str> = result.keys().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Core"]);
}

#[test]
fn content_change_changes_hash() {
    let dir = setup();
    let graph = build(dir.path(), vec![app(), core(dir.path())]);
    let key = GraphTarget::new(dir.path(), "Core");
    let before = hashes(&graph, CacheOutputType::Xcframework)[&key];
    write(dir.path(), "a.swift", "public struct A { let x = 1 }");
    let after = hashes(&graph, CacheOutputType::Xcframework)[&key];
    assert_ne!(before, after);
}

#[test]
fn modification_time_does_not_change_hash() {
    let dir = setup();
    let graph = build(dir.path(), vec![app(), core(dir.path())]);
    let key = GraphTarget::new(dir.path(), "Core");
    let before = hashes(&graph, CacheOutputType::Xcframework)[&key];

    let file = std::fs::OpenOptions::new()
        .write(true)
        .open(dir.path().join("a.swift"))
        .unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(3600))
        .unwrap();
    drop(file);

    let after = hashes(&graph, CacheOutputType::Xcframework)[&key];
    assert_eq!(before, after);
}

#[test]
fn hashing_is_deterministic() {
    let dir = setup();
    let graph = build(dir.path(), vec![app(), core(dir.path())]);
    assert_eq!(
        hashes(&graph, CacheOutputType::Xcframework),
        hashes(&graph, CacheOutputType::Xcframework)
    );
}

#[test]
fn source_declaration_order_does_not_matter() {
    let dir = setup();
    let forward = build(dir.path(), vec![core(dir.path())]);
    let mut reversed_core = core(dir.path());
    reversed_core.sources.reverse();
    let reversed = build(dir.path(), vec![reversed_core]);
    assert_eq!(
        hashes(&forward, CacheOutputType::Xcframework),
        hashes(&reversed, CacheOutputType::Xcframework)
    );
}

#[test]
fn output_type_changes_hash() {
    let dir = setup();
    let graph = build(dir.path(), vec![core(dir.path())]);
    let key = GraphTarget::new(dir.path(), "Core");
    let full = hashes(&graph, CacheOutputType::Xcframework)[&key];
    let device = hashes(&graph, CacheOutputType::XcframeworkDevice)[&key];
    let simulator = hashes(&graph, CacheOutputType::XcframeworkSimulator)[&key];
    assert_ne!(full, device);
    assert_ne!(full, simulator);
    assert_ne!(device, simulator);
}

#[test]
fn settings_change_changes_hash() {
    let dir = setup();
    let key = GraphTarget::new(dir.path(), "Core");
    let plain = build(dir.path(), vec![core(dir.path())]);
    let mut tuned = core(dir.path());
    tuned
        .settings
        .base
        .insert("SWIFT_STRICT_CONCURRENCY".into(), SettingValue::from("complete"));
    let tuned = build(dir.path(), vec![tuned]);
    assert_ne!(
        hashes(&plain, CacheOutputType::Xcframework)[&key],
        hashes(&tuned, CacheOutputType::Xcframework)[&key]
    );
}

#[test]
fn profile_changes_hash() {
    let dir = setup();
    let graph = build(dir.path(), vec![core(dir.path())]);
    let key = GraphTarget::new(dir.path(), "Core");
    let hasher = GraphContentHasher::new(Arc::new(ContentHasher::default()));
    let debug_profile = CacheProfile::new("default", "Debug");
    let release_profile = CacheProfile::new("release", "Release");
    let debug = hasher
        .content_hashes(&graph, &debug_profile, CacheOutputType::Xcframework)
        .unwrap();
    let release = hasher
        .content_hashes(&graph, &release_profile, CacheOutputType::Xcframework)
        .unwrap();
    assert_ne!(debug[&key], release[&key]);
}

#[test]
fn unit_test_targets_are_excluded() {
    let dir = setup();
    let tests = Target {
        dependencies: vec![TargetDependency::Target {
            name: "Core".into(),
        }],
        ..Target::new("CoreTests", Product::UnitTests)
    };
    let graph = build(dir.path(), vec![core(dir.path()), tests]);
    let result = hashes(&graph, CacheOutputType::Xcframework);
    assert!(!result.contains_key(&GraphTarget::new(dir.path(), "CoreTests")));
    assert!(result.contains_key(&GraphTarget::new(dir.path(), "Core")));
}

#[test]
fn framework_depending_on_test_support_is_excluded() {
    let dir = setup();
    write(dir.path(), "Support.swift", "import XCTest");
    let support = Target {
        sources: vec![SourceFile::new(dir.path().join("Support.swift"))],
        dependencies: vec![TargetDependency::Sdk {
            name: "XCTest.framework".into(),
            optional: false,
        }],
        ..Target::new("TestSupport", Product::Framework)
    };
    let mut helpers = core(dir.path());
    helpers.name = "Helpers".into();
    helpers.dependencies = vec![TargetDependency::Target {
        name: "TestSupport".into(),
    }];
    let graph = build(dir.path(), vec![core(dir.path()), support, helpers]);
    let result = hashes(&graph, CacheOutputType::Xcframework);
    let names: Vec<&str> = result.keys().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Core"]);
}

#[test]
fn missing_source_is_fatal_and_names_target() {
    let dir = setup();
    std::fs::remove_file(dir.path().join("b.swift")).unwrap();
    let graph = build(dir.path(), vec![core(dir.path())]);
    let profile = CacheProfile::new("default", "Debug");
    let err = GraphContentHasher::new(Arc::new(ContentHasher::default()))
        .content_hashes(&graph, &profile, CacheOutputType::Xcframework)
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("'Core'"), "{msg}");
    assert!(msg.contains("b.swift"), "{msg}");
}
