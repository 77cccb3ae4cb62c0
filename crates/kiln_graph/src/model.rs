//! Project and target values as produced by manifest loading.
//!
//! These types are plain data: they are owned by the [`Graph`](crate::Graph),
//! cloned and rewritten by mappers, and read by the hashers. Collections that
//! influence hashing or generation are ordered (`Vec`, `BTreeMap`) so that
//! iteration never depends on hash-map layout.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use kiln_common::ContentHash;
use serde::{Deserialize, Serialize};

/// Platform a target is built for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// iOS and iPadOS.
    #[default]
    Ios,
    /// macOS.
    Macos,
    /// tvOS.
    Tvos,
    /// watchOS.
    Watchos,
    /// visionOS.
    Visionos,
}

impl Platform {
    /// Stable identifier used in hashes and generated files.
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Macos => "macos",
            Platform::Tvos => "tvos",
            Platform::Watchos => "watchos",
            Platform::Visionos => "visionos",
        }
    }
}

/// Kind of product a target builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    /// An application bundle.
    App,
    /// A dynamic framework.
    Framework,
    /// A static framework.
    StaticFramework,
    /// A static library.
    StaticLibrary,
    /// A dynamic library.
    DynamicLibrary,
    /// A resource bundle.
    Bundle,
    /// A unit test bundle.
    UnitTests,
    /// A UI test bundle.
    UiTests,
    /// An app extension.
    AppExtension,
    /// A command line tool.
    CommandLineTool,
    /// A compiler macro plugin.
    Macro,
}

impl Product {
    /// Stable identifier used in hashes and generated files.
    pub fn as_str(self) -> &'static str {
        match self {
            Product::App => "app",
            Product::Framework => "framework",
            Product::StaticFramework => "static_framework",
            Product::StaticLibrary => "static_library",
            Product::DynamicLibrary => "dynamic_library",
            Product::Bundle => "bundle",
            Product::UnitTests => "unit_tests",
            Product::UiTests => "ui_tests",
            Product::AppExtension => "app_extension",
            Product::CommandLineTool => "command_line_tool",
            Product::Macro => "macro",
        }
    }

    /// `true` for static and dynamic frameworks, the only cacheable products.
    pub fn is_framework(self) -> bool {
        matches!(self, Product::Framework | Product::StaticFramework)
    }

    /// `true` for unit and UI test bundles.
    pub fn is_test_bundle(self) -> bool {
        matches!(self, Product::UnitTests | Product::UiTests)
    }

    /// `false` for products that cannot carry a resources build phase.
    pub fn supports_resources(self) -> bool {
        !matches!(self, Product::StaticFramework | Product::StaticLibrary)
    }
}

/// A source file compiled into a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Per-file compiler flags.
    #[serde(default)]
    pub compiler_flags: Option<String>,
    /// Precomputed content hash, set for generated files that may not exist yet.
    #[serde(default)]
    pub content_hash: Option<ContentHash>,
}

impl SourceFile {
    /// Creates a source file without flags or a precomputed hash.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            compiler_flags: None,
            content_hash: None,
        }
    }
}

/// A resource file or folder copied into a target's bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFile {
    /// Absolute path of the file or folder.
    pub path: PathBuf,
    /// On-demand resource tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ResourceFile {
    /// Creates an untagged resource.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tags: Vec::new(),
        }
    }
}

/// A build setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// A scalar setting.
    String(String),
    /// A list setting, e.g. search paths.
    Array(Vec<String>),
}

impl SettingValue {
    /// Renders the value the way it appears in a build settings file.
    pub fn render(&self) -> String {
        match self {
            SettingValue::String(s) => s.clone(),
            SettingValue::Array(items) => items.join(" "),
        }
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::String(value.to_string())
    }
}

/// Build settings dictionary keyed by setting name.
pub type SettingsDictionary = BTreeMap<String, SettingValue>;

/// Whether a build configuration is a debug or release variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Debug builds.
    #[default]
    Debug,
    /// Release builds.
    Release,
}

impl Variant {
    /// Stable identifier used in hashes.
    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Debug => "debug",
            Variant::Release => "release",
        }
    }
}

/// Settings for one named build configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Debug or release.
    #[serde(default)]
    pub variant: Variant,
    /// Settings overriding the base settings for this configuration.
    #[serde(default)]
    pub settings: SettingsDictionary,
    /// Optional `.xcconfig` file layered under the settings.
    #[serde(default)]
    pub xcconfig: Option<PathBuf>,
}

/// Base settings plus per-configuration overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Settings shared by every configuration.
    #[serde(default)]
    pub base: SettingsDictionary,
    /// Per-configuration overrides keyed by configuration name.
    #[serde(default)]
    pub configurations: BTreeMap<String, Configuration>,
}

/// Destination of a copy-files build phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyDestination {
    /// An absolute path.
    AbsolutePath,
    /// The products directory.
    ProductsDirectory,
    /// The bundle wrapper.
    Wrapper,
    /// The resources directory.
    Resources,
    /// The executables directory.
    Executables,
    /// The frameworks directory.
    Frameworks,
    /// The shared frameworks directory.
    SharedFrameworks,
    /// The shared support directory.
    SharedSupport,
    /// The plug-ins directory.
    Plugins,
}

impl CopyDestination {
    /// Discriminator string that participates in the copy-files hash.
    pub fn as_str(self) -> &'static str {
        match self {
            CopyDestination::AbsolutePath => "absolute_path",
            CopyDestination::ProductsDirectory => "products_directory",
            CopyDestination::Wrapper => "wrapper",
            CopyDestination::Resources => "resources",
            CopyDestination::Executables => "executables",
            CopyDestination::Frameworks => "frameworks",
            CopyDestination::SharedFrameworks => "shared_frameworks",
            CopyDestination::SharedSupport => "shared_support",
            CopyDestination::Plugins => "plugins",
        }
    }
}

/// A copy-files build phase. Phases run in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyFilesAction {
    /// Phase name.
    pub name: String,
    /// Where the files are copied to.
    pub destination: CopyDestination,
    /// Optional subdirectory below the destination.
    #[serde(default)]
    pub subpath: Option<String>,
    /// Files or folders copied by this phase.
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

/// When a script phase runs relative to compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptOrder {
    /// Before the sources phase.
    Pre,
    /// After all other phases.
    Post,
}

impl ScriptOrder {
    /// Stable identifier used in hashes.
    pub fn as_str(self) -> &'static str {
        match self {
            ScriptOrder::Pre => "pre",
            ScriptOrder::Post => "post",
        }
    }
}

/// A shell script build phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetScript {
    /// Phase name.
    pub name: String,
    /// Position of the phase.
    pub order: ScriptOrder,
    /// Embedded script body.
    pub script: String,
    /// Input files whose content affects the script's output.
    #[serde(default)]
    pub input_paths: Vec<PathBuf>,
    /// Declared outputs (may contain build variables, so never read).
    #[serde(default)]
    pub output_paths: Vec<String>,
}

/// Header files exposed by a target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers {
    /// Public headers.
    #[serde(default)]
    pub public: Vec<PathBuf>,
    /// Private headers.
    #[serde(default)]
    pub private: Vec<PathBuf>,
    /// Project headers.
    #[serde(default)]
    pub project: Vec<PathBuf>,
}

impl Headers {
    /// `true` if no header list has entries.
    pub fn is_empty(&self) -> bool {
        self.public.is_empty() && self.private.is_empty() && self.project.is_empty()
    }
}

/// Free-form metadata attached to a target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetMetadata {
    /// Tags used by target queries.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Marks a framework that only exists to support tests.
    #[serde(default)]
    pub testing_only: bool,
    /// Marks a target that should be removed before generation.
    #[serde(default)]
    pub prune: bool,
}

/// A dependency as declared in a manifest, before graph resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetDependency {
    /// A target in the same project.
    Target {
        /// Target name.
        name: String,
    },
    /// A target in another project.
    Project {
        /// Target name.
        target: String,
        /// Path of the project that declares the target.
        path: PathBuf,
    },
    /// A precompiled framework.
    Framework {
        /// Path of the `.framework`.
        path: PathBuf,
    },
    /// A precompiled xcframework.
    Xcframework {
        /// Path of the `.xcframework`.
        path: PathBuf,
    },
    /// A precompiled library.
    Library {
        /// Path of the library binary.
        path: PathBuf,
    },
    /// A system SDK.
    Sdk {
        /// SDK name, e.g. `XCTest.framework`.
        name: String,
        /// Weakly linked when `true`.
        #[serde(default)]
        optional: bool,
    },
    /// A Swift package product.
    Package {
        /// Product name.
        product: String,
    },
}

/// A buildable unit inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Target name, unique within its project.
    pub name: String,
    /// Platform the target builds for.
    #[serde(default)]
    pub platform: Platform,
    /// Product kind.
    pub product: Product,
    /// Bundle identifier.
    #[serde(default)]
    pub bundle_id: String,
    /// Compiled sources in manifest declaration order.
    #[serde(default)]
    pub sources: Vec<SourceFile>,
    /// Resources in manifest declaration order.
    #[serde(default)]
    pub resources: Vec<ResourceFile>,
    /// Target build settings.
    #[serde(default)]
    pub settings: Settings,
    /// Copy-files phases in execution order.
    #[serde(default)]
    pub copy_files: Vec<CopyFilesAction>,
    /// Script phases in execution order.
    #[serde(default)]
    pub scripts: Vec<TargetScript>,
    /// Exposed headers.
    #[serde(default)]
    pub headers: Option<Headers>,
    /// Environment variables for running the product.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Declared dependencies.
    #[serde(default)]
    pub dependencies: Vec<TargetDependency>,
    /// Metadata.
    #[serde(default)]
    pub metadata: TargetMetadata,
}

impl Target {
    /// Creates an empty target with the given name and product.
    pub fn new(name: impl Into<String>, product: Product) -> Self {
        let name = name.into();
        Self {
            bundle_id: format!("dev.kiln.{name}"),
            name,
            platform: Platform::default(),
            product,
            sources: Vec::new(),
            resources: Vec::new(),
            settings: Settings::default(),
            copy_files: Vec::new(),
            scripts: Vec::new(),
            headers: None,
            environment: BTreeMap::new(),
            dependencies: Vec::new(),
            metadata: TargetMetadata::default(),
        }
    }
}

/// A reference to a target from a scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetReference {
    /// Path of the project declaring the target.
    pub project_path: PathBuf,
    /// Target name.
    pub name: String,
}

/// A scheme listing the targets it builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheme {
    /// Scheme name.
    pub name: String,
    /// Targets built by the scheme.
    #[serde(default)]
    pub build_targets: Vec<TargetReference>,
}

/// A project: a directory with a manifest and its targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Absolute directory of the project.
    pub path: PathBuf,
    /// Project name.
    pub name: String,
    /// Project-level settings.
    #[serde(default)]
    pub settings: Settings,
    /// Targets in declaration order.
    #[serde(default)]
    pub targets: Vec<Target>,
    /// Schemes.
    #[serde(default)]
    pub schemes: Vec<Scheme>,
}

impl Project {
    /// Creates a project with default settings and no schemes.
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>, targets: Vec<Target>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            settings: Settings::default(),
            targets,
            schemes: Vec::new(),
        }
    }

    /// Looks up a target by name.
    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Directory for files generated on the project's behalf.
    pub fn derived_directory(&self) -> PathBuf {
        self.path.join("Derived")
    }

    /// Resolves a manifest path relative to the project directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.path.join(path)
        }
    }
}

/// A workspace grouping several projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    /// Absolute directory of the workspace.
    pub path: PathBuf,
    /// Workspace name.
    pub name: String,
    /// Project paths in workspace order.
    #[serde(default)]
    pub projects: Vec<PathBuf>,
}

/// A workspace together with the loaded projects it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceWithProjects {
    /// The workspace.
    pub workspace: Workspace,
    /// Loaded projects in workspace order.
    pub projects: Vec<Project>,
}
