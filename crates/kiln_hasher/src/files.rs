//! Aggregate hashes over a target's file lists.
//!
//! Sources, resources and headers are order-insensitive: they are sorted by
//! path before hashing so manifest declaration order never changes a key.
//! Copy-files and script phases run in declaration order, so their order is
//! part of the hash.

use std::path::PathBuf;

use kiln_common::ContentHash;
use kiln_graph::{CopyFilesAction, Headers, ResourceFile, SourceFile, TargetScript};

use crate::content::ContentHasher;
use crate::error::HashError;

/// Hashes compiled sources.
///
/// A precomputed `content_hash` (set for generated files) is used instead of
/// reading the file. Compiler flags, when present, contribute their own hash
/// right after the file's hash.
pub fn hash_sources(
    hasher: &ContentHasher,
    sources: &[SourceFile],
) -> Result<ContentHash, HashError> {
    let mut sorted: Vec<&SourceFile> = sources.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let mut fragments = Vec::with_capacity(sorted.len());
    for source in sorted {
        let hash = match source.content_hash {
            Some(hash) => hash,
            None => hasher.hash_path(&source.path)?,
        };
        fragments.push(hash.to_string());
        if let Some(flags) = &source.compiler_flags {
            fragments.push(hasher.hash_str(flags).to_string());
        }
    }
    Ok(hasher.hash_strings(&fragments))
}

/// Hashes resources with the same rule as sources: sorted by path, hashed by content.
///
/// Resources may be folders (asset catalogs, bundles) and are hashed recursively.
pub fn hash_resources(
    hasher: &ContentHasher,
    resources: &[ResourceFile],
) -> Result<ContentHash, HashError> {
    let mut sorted: Vec<&ResourceFile> = resources.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let mut fragments = Vec::with_capacity(sorted.len());
    for resource in sorted {
        fragments.push(hasher.hash_path(&resource.path)?.to_string());
        if !resource.tags.is_empty() {
            let mut tags = resource.tags.clone();
            tags.sort();
            fragments.push(hasher.hash_strings(&tags).to_string());
        }
    }
    Ok(hasher.hash_strings(&fragments))
}

/// Hashes copy-files phases in the order given.
pub fn hash_copy_files(
    hasher: &ContentHasher,
    actions: &[CopyFilesAction],
) -> Result<ContentHash, HashError> {
    let mut fragments = Vec::new();
    for action in actions {
        for file in &action.files {
            fragments.push(hasher.hash_path(file)?.to_string());
        }
        fragments.push(action.name.clone());
        fragments.push(action.destination.as_str().to_string());
        if let Some(subpath) = &action.subpath {
            fragments.push(subpath.clone());
        }
    }
    Ok(hasher.hash_strings(&fragments))
}

/// Hashes header lists: each list sorted and hashed by content, in the order
/// public, private, project.
pub fn hash_headers(hasher: &ContentHasher, headers: &Headers) -> Result<ContentHash, HashError> {
    let mut fragments = Vec::with_capacity(3);
    for list in [&headers.public, &headers.private, &headers.project] {
        let mut sorted: Vec<&PathBuf> = list.iter().collect();
        sorted.sort();
        let hashes = sorted
            .into_iter()
            .map(|path| hasher.hash_path(path).map(|h| h.to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        fragments.push(hasher.hash_strings(&hashes).to_string());
    }
    Ok(hasher.hash_strings(&fragments))
}

/// Hashes script phases in the order given.
///
/// Input paths that do not exist are skipped: they are usually produced by an
/// earlier phase of the same build. Output paths contribute their literal
/// text because they routinely reference build variables.
pub fn hash_scripts(
    hasher: &ContentHasher,
    scripts: &[TargetScript],
) -> Result<ContentHash, HashError> {
    let mut fragments = Vec::new();
    for script in scripts {
        fragments.push(script.name.clone());
        fragments.push(script.order.as_str().to_string());
        fragments.push(hasher.hash_str(&script.script).to_string());
        for input in &script.input_paths {
            if hasher.file_system().exists(input) {
                fragments.push(hasher.hash_path(input)?.to_string());
            }
        }
        fragments.push(hasher.hash_strings(&script.output_paths).to_string());
    }
    Ok(hasher.hash_strings(&fragments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_graph::{CopyDestination, ScriptOrder};
    use std::path::Path;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn sources_ignore_declaration_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = SourceFile::new(write(dir.path(), "a.swift", "struct A {}"));
        let b = SourceFile::new(write(dir.path(), "b.swift", "struct B {}"));
        let hasher = ContentHasher::default();
        assert_eq!(
            hash_sources(&hasher, &[a.clone(), b.clone()]).unwrap(),
            hash_sources(&hasher, &[b, a]).unwrap()
        );
    }

    #[test]
    fn precomputed_hash_skips_reading() {
        let hasher = ContentHasher::default();
        let generated = SourceFile {
            content_hash: Some(ContentHash::from_bytes(b"generated")),
            ..SourceFile::new("/does/not/exist/Generated.swift")
        };
        let expected = hasher.hash_strings(&[ContentHash::from_bytes(b"generated").to_string()]);
        assert_eq!(hash_sources(&hasher, &[generated]).unwrap(), expected);
    }

    #[test]
    fn compiler_flags_change_the_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.m", "int a;");
        let hasher = ContentHasher::default();
        let plain = hash_sources(&hasher, &[SourceFile::new(&path)]).unwrap();
        let flagged = hash_sources(
            &hasher,
            &[SourceFile {
                compiler_flags: Some("-fno-objc-arc".into()),
                ..SourceFile::new(&path)
            }],
        )
        .unwrap();
        assert_ne!(plain, flagged);
    }

    #[test]
    fn missing_source_fails() {
        let hasher = ContentHasher::default();
        let err = hash_sources(&hasher, &[SourceFile::new("/nonexistent/a.swift")]).unwrap_err();
        assert!(matches!(err, HashError::FileNotFound { .. }));
    }

    #[test]
    fn resources_sorted_and_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("Assets.xcassets");
        std::fs::create_dir_all(&assets).unwrap();
        write(&assets, "Contents.json", "{}");
        let strings = ResourceFile::new(write(dir.path(), "Localizable.strings", "\"a\" = \"b\";"));
        let catalog = ResourceFile::new(&assets);
        let hasher = ContentHasher::default();
        let forward = hash_resources(&hasher, &[catalog.clone(), strings.clone()]).unwrap();
        assert_eq!(forward, hash_resources(&hasher, &[strings, catalog]).unwrap());
    }

    #[test]
    fn copy_files_order_matters() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.txt", "a");
        let b = write(dir.path(), "b.txt", "b");
        let action = |name: &str, file: &PathBuf| CopyFilesAction {
            name: name.into(),
            destination: CopyDestination::Resources,
            subpath: None,
            files: vec![file.clone()],
        };
        let hasher = ContentHasher::default();
        let first = hash_copy_files(&hasher, &[action("one", &a), action("two", &b)]).unwrap();
        let second = hash_copy_files(&hasher, &[action("two", &b), action("one", &a)]).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn copy_files_destination_and_subpath_participate() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.txt", "a");
        let base = CopyFilesAction {
            name: "Embed".into(),
            destination: CopyDestination::Resources,
            subpath: None,
            files: vec![a],
        };
        let moved = CopyFilesAction {
            destination: CopyDestination::SharedSupport,
            ..base.clone()
        };
        let nested = CopyFilesAction {
            subpath: Some("fonts".into()),
            ..base.clone()
        };
        let hasher = ContentHasher::default();
        let h = |action: &CopyFilesAction| {
            hash_copy_files(&hasher, std::slice::from_ref(action)).unwrap()
        };
        assert_ne!(h(&base), h(&moved));
        assert_ne!(h(&base), h(&nested));
    }

    #[test]
    fn headers_visibility_matters() {
        let dir = tempfile::tempdir().unwrap();
        let header = write(dir.path(), "Core.h", "#import <Foundation/Foundation.h>");
        let hasher = ContentHasher::default();
        let public = Headers {
            public: vec![header.clone()],
            ..Headers::default()
        };
        let private = Headers {
            private: vec![header],
            ..Headers::default()
        };
        assert_ne!(
            hash_headers(&hasher, &public).unwrap(),
            hash_headers(&hasher, &private).unwrap()
        );
    }

    #[test]
    fn scripts_skip_missing_inputs_and_track_body() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "input.txt", "in");
        let script = TargetScript {
            name: "Lint".into(),
            order: ScriptOrder::Pre,
            script: "swiftlint".into(),
            input_paths: vec![input, dir.path().join("produced-later.txt")],
            output_paths: vec!["$(DERIVED_FILE_DIR)/lint.log".into()],
        };
        let hasher = ContentHasher::default();
        let first = hash_scripts(&hasher, std::slice::from_ref(&script)).unwrap();
        let changed = TargetScript {
            script: "swiftlint --strict".into(),
            ..script
        };
        assert_ne!(first, hash_scripts(&hasher, &[changed]).unwrap());
    }
}
