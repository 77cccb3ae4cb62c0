use std::collections::BTreeSet;

use kiln_common::ContentHash;
use kiln_graph::{
    Product, Project, SettingValue, Settings, SourceFile, Target, TargetDependency,
};

use crate::error::MapperError;
use crate::mapper::{Mapped, ProjectMapper};
use crate::side_effect::SideEffectDescriptor;

/// Gives every target with resources a synthesized bundle accessor.
///
/// Targets whose product cannot hold resources (static frameworks and
/// libraries) get a companion bundle target named `<Project>_<Target>` that
/// takes over their resources and copy-files phases; the original target
/// depends on it. Companion targets are appended after the existing targets,
/// in target order.
///
/// The accessor is written to
/// `<project>/Derived/Sources/KilnBundle+<Target>.swift` and added to the
/// target's sources with a precomputed hash, so hashing does not need the
/// file on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourcesProjectMapper;

impl ProjectMapper for ResourcesProjectMapper {
    fn name(&self) -> &str {
        "resources"
    }

    fn map(&self, mut project: Project) -> Result<Mapped<Project>, MapperError> {
        let mut side_effects = Vec::new();
        let mut companions = Vec::new();
        let project_name = project.name.clone();
        let sources_dir = project.derived_directory().join("Sources");
        let mut taken: BTreeSet<String> = project.targets.iter().map(|t| t.name.clone()).collect();

        for target in &mut project.targets {
            if target.resources.is_empty() {
                continue;
            }
            tracing::debug!(
                project = %project_name,
                target = %target.name,
                "synthesizing resource bundle accessor"
            );

            let bundle_name = format!("{}_{}", project_name, sanitized_module_name(&target.name));
            let owns_bundle = target.product.supports_resources();
            if !owns_bundle {
                if !taken.insert(bundle_name.clone()) {
                    return Err(MapperError::Failed {
                        mapper: self.name().to_string(),
                        path: project.path.clone(),
                        reason: format!(
                            "resource bundle '{bundle_name}' for target '{}' clashes with \
                             an existing target",
                            target.name
                        ),
                    });
                }
                companions.push(companion_bundle(target, &bundle_name));
                target.resources.clear();
                target.copy_files.clear();
                target.dependencies.push(TargetDependency::Target {
                    name: bundle_name.clone(),
                });
            }

            if target.sources.is_empty() {
                continue;
            }
            let path = sources_dir.join(format!(
                "KilnBundle+{}.swift",
                sanitized_module_name(&target.name)
            ));
            let contents = accessor_source(&target.name, &bundle_name, owns_bundle);
            target.sources.push(SourceFile {
                content_hash: Some(ContentHash::from_str_content(&contents)),
                ..SourceFile::new(&path)
            });
            side_effects.push(SideEffectDescriptor::write_file(path, contents));
        }

        project.targets.extend(companions);
        Ok((project, side_effects))
    }
}

fn companion_bundle(target: &Target, bundle_name: &str) -> Target {
    let mut settings = Settings::default();
    for (key, value) in [
        ("CODE_SIGNING_ALLOWED", "NO"),
        ("SKIP_INSTALL", "YES"),
        ("GENERATE_MASTER_OBJECT_FILE", "NO"),
        ("VERSIONING_SYSTEM", ""),
    ] {
        settings.base.insert(key.to_string(), SettingValue::from(value));
    }
    Target {
        platform: target.platform,
        bundle_id: format!("{}.generated.resources", target.bundle_id),
        resources: target.resources.clone(),
        copy_files: target.copy_files.clone(),
        settings,
        metadata: target.metadata.clone(),
        ..Target::new(bundle_name, Product::Bundle)
    }
}

/// Replaces characters that are not valid in a module name with `_`.
fn sanitized_module_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn accessor_source(target_name: &str, bundle_name: &str, owns_bundle: bool) -> String {
    let lookup = if owns_bundle {
        "Bundle(for: BundleFinder.self)".to_string()
    } else {
        format!(
            r#"[
            Bundle.main.resourceURL,
            Bundle(for: BundleFinder.self).resourceURL,
            Bundle.main.bundleURL,
        ]
        .compactMap {{ $0?.appendingPathComponent("{bundle_name}.bundle") }}
        .lazy
        .compactMap(Bundle.init(url:))
        .first ?? Bundle(for: BundleFinder.self)"#
        )
    };
    format!(
        r#"// Generated by kiln. Do not edit.
import Foundation

private class BundleFinder {{}}

public extension Bundle {{
    /// Resources of the {target_name} target.
    static let module: Bundle = {{
        {lookup}
    }}()
}}
"#
    )
}
