//! Manifest support for rome.
//!
//! A manifest describes the installation the pipeline builds: where the
//! sandbox and project live, the hook options, and every pod target with its
//! module specs. It stands in for the dependency installer when `rome` runs
//! on its own.
//!
//! ## Manifest Location
//!
//! The manifest is searched for in the following order:
//! 1. Current working directory (`./rome.toml`, `./rome.yaml`, `./rome.yml`)
//! 2. Parent directories (up to the repository root or filesystem root)
//!
//! ## Example Manifest
//!
//! ```toml
//! [project]
//! sandbox_root = "Pods"
//!
//! [options]
//! dsym = true
//! configuration = "Both"
//! post_compile = "echo done"
//!
//! [[targets]]
//! label = "Pods-App"
//! platform = "ios"
//! deployment_target = "15.0"
//!
//! [[targets.specs]]
//! root = "Alamofire"
//!
//! [[targets.specs]]
//! root = "GoogleMaps"
//! vendored_frameworks = ["Maps/Frameworks/GoogleMaps.xcframework"]
//! resources = ["Maps/Resources/GoogleMaps.bundle"]
//! ```

use anyhow::{Context, Result, bail};
use rome_sdk::{InstallerContext, ModuleSpec, Target};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Manifest file names, in lookup order.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["rome.toml", "rome.yaml", "rome.yml"];

/// Root structure of a `rome.toml` manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RomeManifest {
    /// Sandbox and project locations.
    pub project: ProjectConfig,

    /// Hook options, passed through untyped.
    ///
    /// Recognized keys: `dsym`, `configuration`, `pre_compile`, `post_compile`.
    pub options: Map<String, Value>,

    /// Pod targets, in build order.
    pub targets: Vec<TargetConfig>,
}

/// Sandbox and project locations, relative to the manifest directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// The `Pods` sandbox. Its parent receives `Rome/`, `dSYM/` and `build/`.
    ///
    /// Defaults to `Pods`.
    pub sandbox_root: PathBuf,

    /// Xcode project containing the pod targets.
    ///
    /// Defaults to `<sandbox_root>/Pods.xcodeproj`.
    pub project: Option<PathBuf>,

    /// Build settings file toggled before each pass and passed to xcodebuild.
    ///
    /// Defaults to `<sandbox_root>/Rome.xcconfig`.
    pub xcconfig: Option<PathBuf>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            sandbox_root: PathBuf::from("Pods"),
            project: None,
            xcconfig: None,
        }
    }
}

/// One pod target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Scheme name, e.g. `Pods-App`.
    pub label: String,

    /// Platform tag: `ios`, `osx`, `tvos` or `watchos`.
    pub platform: String,

    /// Minimum OS version, used to pick a simulator.
    #[serde(default)]
    pub deployment_target: Option<String>,

    /// Module specs built by the target.
    #[serde(default)]
    pub specs: Vec<SpecConfig>,
}

/// One module spec with its pre-built files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecConfig {
    /// Root spec name.
    pub root: String,

    /// Module name, when it differs from the root name.
    #[serde(default)]
    pub module: Option<String>,

    /// Vendored libraries, relative to `<sandbox_root>/<root>`.
    #[serde(default)]
    pub vendored_libraries: Vec<PathBuf>,

    /// Vendored frameworks, relative to `<sandbox_root>/<root>`.
    #[serde(default)]
    pub vendored_frameworks: Vec<PathBuf>,

    /// Resources, relative to `<sandbox_root>/<root>`.
    #[serde(default)]
    pub resources: Vec<PathBuf>,
}

impl SpecConfig {
    /// The spec as the pipeline sees it.
    pub fn module_spec(&self) -> ModuleSpec {
        match &self.module {
            Some(module) => ModuleSpec::new(&self.root, module),
            None => ModuleSpec::named(&self.root),
        }
    }
}

/// Absolute locations derived from a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// The `Pods` sandbox.
    pub sandbox_root: PathBuf,
    /// The Xcode project.
    pub project: PathBuf,
    /// The xcconfig used as the project model.
    pub xcconfig: PathBuf,
}

impl RomeManifest {
    /// Loads a manifest, choosing YAML or TOML by extension.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {:?}", path))?;

        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml" | "yml")
        );
        let manifest: RomeManifest = if is_yaml {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse manifest: {:?}", path))?
        } else {
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse manifest: {:?}", path))?
        };

        manifest.validate()?;
        Ok(manifest)
    }

    /// Attempts to find and load a manifest from the current directory or any
    /// parent directory.
    pub fn discover() -> Result<Option<(Self, PathBuf)>> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&cwd)
    }

    /// Attempts to find and load a manifest starting from `start_dir`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some((manifest, path)))` - Found and loaded manifest with its path
    /// * `Ok(None)` - No manifest found
    /// * `Err` - If a manifest was found but couldn't be parsed
    pub fn discover_from(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut current = start_dir.to_path_buf();

        loop {
            for name in CONFIG_FILE_NAMES {
                let path = current.join(name);
                if path.is_file() {
                    let manifest = Self::load_from_file(&path)?;
                    return Ok(Some((manifest, path)));
                }
            }

            // Stop at repository root or filesystem root
            if current.join(".git").exists() || !current.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Rejects manifests the pipeline cannot work with.
    fn validate(&self) -> Result<()> {
        for (index, target) in self.targets.iter().enumerate() {
            if target.label.trim().is_empty() {
                bail!("targets[{}] has an empty label", index);
            }
            if let Some(spec) = target.specs.iter().find(|s| s.root.trim().is_empty()) {
                bail!(
                    "target '{}' has a spec with an empty root name (module {:?})",
                    target.label,
                    spec.module
                );
            }
        }
        Ok(())
    }

    /// Resolves the project section against `base_dir`, the manifest's directory.
    pub fn resolve_paths(&self, base_dir: &Path) -> ResolvedPaths {
        let sandbox_root = base_dir.join(&self.project.sandbox_root);
        ResolvedPaths {
            project: self
                .project
                .project
                .as_ref()
                .map(|p| base_dir.join(p))
                .unwrap_or_else(|| sandbox_root.join("Pods.xcodeproj")),
            xcconfig: self
                .project
                .xcconfig
                .as_ref()
                .map(|p| base_dir.join(p))
                .unwrap_or_else(|| sandbox_root.join("Rome.xcconfig")),
            sandbox_root,
        }
    }

    /// Builds the installer context the pipeline runs on.
    pub fn installer_context(&self, paths: &ResolvedPaths) -> InstallerContext {
        let targets = self
            .targets
            .iter()
            .map(|target| Target {
                label: target.label.clone(),
                platform: target.platform.clone(),
                deployment_target: target.deployment_target.clone(),
                specs: target.specs.iter().map(SpecConfig::module_spec).collect(),
            })
            .collect();

        let mut context = InstallerContext::new(&paths.sandbox_root, targets);
        context.project_path = paths.project.clone();
        context
    }

    /// A string option such as `pre_compile`.
    pub fn string_option(&self, key: &str) -> Result<Option<&str>> {
        match self.options.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.as_str())),
            Some(other) => bail!("option '{}' must be a string, got {}", key, other),
        }
    }

    /// Generates a starter manifest as a commented TOML string.
    pub fn generate_starter_toml(label: &str, platform: &str) -> String {
        format!(
            r#"# rome manifest
# Describes the pod targets to prebuild into xcframeworks.
# CLI flags override the [options] table when provided.

[project]
# CocoaPods sandbox; Rome/ and dSYM/ are written next to it (default: Pods)
sandbox_root = "Pods"

# Xcode project holding the pod targets (default: <sandbox_root>/Pods.xcodeproj)
# project = "Pods/Pods.xcodeproj"

# Build settings file managed by rome (default: <sandbox_root>/Rome.xcconfig)
# xcconfig = "Pods/Rome.xcconfig"

[options]
# Stage dSYM bundles to dSYM/<environment> (default: true)
dsym = true

# Debug, Release or Both (default: Debug)
configuration = "Debug"

# Shell commands run before and after the build (optional)
# pre_compile = "echo starting"
# post_compile = "echo finished"

[[targets]]
# Scheme built with xcodebuild
label = "{label}"

# ios, osx, tvos or watchos
platform = "{platform}"

# Minimum OS version, used to choose the simulator (optional)
deployment_target = "15.0"

[[targets.specs]]
# Root spec name; also names the merged xcframework
root = "Alamofire"

# Module name when it differs from the root (optional)
# module = "Alamofire"

# Pre-built files, relative to <sandbox_root>/<root> (optional)
# vendored_frameworks = ["Frameworks/Vendor.xcframework"]
# vendored_libraries = ["lib/libvendor.a"]
# resources = ["Resources/Vendor.bundle"]
"#,
            label = label,
            platform = platform,
        )
    }
}

/// Locates the manifest for a command.
///
/// An explicit `--manifest` path wins over discovery.
#[derive(Debug, Default)]
pub struct ConfigResolver {
    /// Loaded manifest, if any.
    pub manifest: Option<RomeManifest>,

    /// Path to the loaded manifest, if any.
    pub manifest_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Loads the manifest at `path`, or discovers one from the current directory.
    pub fn new(path: Option<&Path>) -> Result<Self> {
        let found = match path {
            Some(path) => Some((RomeManifest::load_from_file(path)?, path.to_path_buf())),
            None => RomeManifest::discover()?,
        };
        Ok(match found {
            Some((manifest, path)) => Self {
                manifest: Some(manifest),
                manifest_path: Some(path),
            },
            None => Self::default(),
        })
    }

    /// The loaded manifest and its path, or an error explaining how to create one.
    pub fn require(&self) -> Result<(&RomeManifest, &Path)> {
        match (&self.manifest, &self.manifest_path) {
            (Some(manifest), Some(path)) => Ok((manifest, path.as_path())),
            _ => bail!(
                "No rome manifest found.\n\n\
                 Looked for {} in the current directory and its parents.\n\
                 Run `rome init` to create one, or pass --manifest <PATH>.",
                CONFIG_FILE_NAMES.join(", ")
            ),
        }
    }

    /// Directory relative manifest paths are resolved against.
    pub fn base_dir(&self) -> PathBuf {
        self.manifest_path
            .as_deref()
            .and_then(Path::parent)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
