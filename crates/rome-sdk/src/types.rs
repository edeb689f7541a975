//! Core types for rome-sdk.
//!
//! This module defines the fundamental types used throughout the SDK:
//!
//! - [`RomeError`] - Error types for build, merge and staging operations
//! - [`Configuration`] / [`ConfigurationSelection`] - Xcode build configurations
//! - [`Target`] / [`ModuleSpec`] - The build units supplied by the installer
//! - [`InstallerContext`] - Everything the installer hands to the hook
//! - [`RunReport`] - Output from a pipeline run

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Error types for rome-sdk operations.
///
/// Only fatal conditions are represented here. Recoverable situations (a module
/// missing one of its environment products, a merge that produced nothing) are
/// logged and recorded in the [`RunReport`] instead.
///
/// # Example
///
/// ```ignore
/// use rome_sdk::{Rome, RomeError};
///
/// match rome.run(&context, &files, &mut project) {
///     Ok(report) => println!("Built {} configuration(s)", report.passes.len()),
///     Err(RomeError::UnknownPlatform(tag)) => eprintln!("Unsupported platform {}", tag),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum RomeError {
    /// A target declared a platform family that has no environment mapping.
    ///
    /// This is raised before any build tool invocation so nothing is built or
    /// copied for a run that cannot complete.
    #[error("Unknown platform '{0}'.\n\nSupported platforms: ios, osx (macos), tvos, watchos")]
    UnknownPlatform(String),

    /// The scratch build directory did not exist after all targets were built.
    ///
    /// `xcodebuild` exited successfully but produced nothing where products were
    /// expected, which usually means `SYMROOT` was overridden elsewhere.
    #[error(
        "The build directory was not found in the expected location: {0}\n\n\
         xcodebuild reported success but wrote no products. Check that no xcconfig or \
         project setting overrides SYMROOT."
    )]
    MissingBuildDirectory(PathBuf),

    /// `xcodebuild` exited with a non-zero status for one target/environment pair.
    #[error(
        "xcodebuild failed for scheme '{scheme}' ({configuration}, sdk {sdk}).\n\n\
         Exit status: {status}\n\n\
         Output (last lines):\n{output}"
    )]
    BuildFailed {
        /// Scheme (target label) that was being built.
        scheme: String,
        /// SDK / environment name passed with `-sdk`.
        sdk: String,
        /// Configuration name.
        configuration: String,
        /// Exit status as reported by the process.
        status: String,
        /// Tail of the combined stdout/stderr.
        output: String,
    },

    /// An external tool could not be started at all.
    #[error("Failed to start {tool}.\n\nError: {source}\n\nEnsure the Xcode command line tools are installed and on PATH.")]
    ToolUnavailable {
        /// Program name.
        tool: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// A filesystem operation failed while staging artifacts.
    #[error("Failed to {action} {path}: {source}")]
    Fs {
        /// What was being attempted ("copy", "remove", ...).
        action: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}. Check file paths and permissions")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The hook options or other configuration were invalid.
    #[error("configuration error: {0}. Check the hook options or rome.toml")]
    Config(String),

    /// The project model rejected a read or write.
    #[error("project error: {0}")]
    Project(String),

    /// A user supplied pre/post compile hook failed.
    #[error("{stage} hook failed: {message}")]
    Hook {
        /// `pre_compile` or `post_compile`.
        stage: &'static str,
        /// Message reported by the hook.
        message: String,
    },
}

impl RomeError {
    pub(crate) fn fs(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        RomeError::Fs {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// An Xcode build configuration.
///
/// # Example
///
/// ```
/// use rome_sdk::Configuration;
///
/// assert_eq!(Configuration::Debug.as_str(), "Debug");
/// assert_eq!("release".parse::<Configuration>().unwrap(), Configuration::Release);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Configuration {
    /// `Debug`, the installer default.
    Debug,
    /// `Release`.
    Release,
}

impl Configuration {
    /// Returns the name Xcode uses for the configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Configuration::Debug => "Debug",
            Configuration::Release => "Release",
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Configuration {
    type Err = RomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Configuration::Debug),
            "release" => Ok(Configuration::Release),
            _ => Err(RomeError::Config(format!(
                "unknown configuration '{}', expected Debug or Release",
                s
            ))),
        }
    }
}

/// Which configurations a run builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationSelection {
    /// A single configuration.
    Single(Configuration),
    /// Release, then Debug.
    Both,
}

impl Default for ConfigurationSelection {
    fn default() -> Self {
        ConfigurationSelection::Single(Configuration::Debug)
    }
}

impl ConfigurationSelection {
    /// Configurations in the order they are built.
    pub fn configurations(&self) -> Vec<Configuration> {
        match self {
            ConfigurationSelection::Single(configuration) => vec![*configuration],
            ConfigurationSelection::Both => vec![Configuration::Release, Configuration::Debug],
        }
    }
}

impl FromStr for ConfigurationSelection {
    type Err = RomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("both") {
            return Ok(ConfigurationSelection::Both);
        }
        s.parse()
            .map(ConfigurationSelection::Single)
            .map_err(|_| {
                RomeError::Config(format!(
                    "unknown configuration '{}', expected Debug, Release or Both",
                    s
                ))
            })
    }
}

/// One distributable module (a pod spec) inside a [`Target`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// Root spec name. Names the product directory and the merged xcframework.
    pub root_name: String,
    /// Module name. Names the `.framework` inside the product directory.
    pub module_name: String,
}

impl ModuleSpec {
    /// Creates a spec whose module name differs from its root name.
    pub fn new(root_name: impl Into<String>, module_name: impl Into<String>) -> Self {
        Self {
            root_name: root_name.into(),
            module_name: module_name.into(),
        }
    }

    /// Creates a spec whose module name equals its root name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            module_name: name.clone(),
            root_name: name,
        }
    }
}

/// A logical build unit: one scheme built for one platform family.
///
/// The platform is kept as the raw tag the installer supplied. It is only
/// resolved once the run starts so an unsupported tag aborts the run instead of
/// failing to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Scheme label passed to `xcodebuild -scheme`.
    pub label: String,
    /// Platform family tag (`ios`, `osx`, `tvos`, `watchos`).
    pub platform: String,
    /// Minimum OS version, used to pick a simulator destination.
    pub deployment_target: Option<String>,
    /// Module specs, in installer order.
    pub specs: Vec<ModuleSpec>,
}

impl Target {
    /// Unique (root, module) pairs, first occurrence order.
    pub fn unique_modules(&self) -> Vec<&ModuleSpec> {
        let mut seen = std::collections::HashSet::new();
        self.specs.iter().filter(|spec| seen.insert(*spec)).collect()
    }
}

/// What the dependency installer hands to the hook.
#[derive(Debug, Clone)]
pub struct InstallerContext {
    /// The `Pods` sandbox directory. Its parent is the output root.
    pub sandbox_root: PathBuf,
    /// The generated `Pods.xcodeproj`.
    pub project_path: PathBuf,
    /// Umbrella targets, in installer order.
    pub targets: Vec<Target>,
}

impl InstallerContext {
    /// Creates a context whose project lives at `<sandbox_root>/Pods.xcodeproj`.
    pub fn new(sandbox_root: impl Into<PathBuf>, targets: Vec<Target>) -> Self {
        let sandbox_root = sandbox_root.into();
        Self {
            project_path: sandbox_root.join("Pods.xcodeproj"),
            sandbox_root,
            targets,
        }
    }

    /// Directory that receives `Rome/`, `dSYM/` and the transient `build/`.
    pub fn output_root(&self) -> PathBuf {
        self.sandbox_root
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Pre-vendored files a module spec declares for a platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleFiles {
    /// Static or dynamic libraries shipped with the pod.
    pub vendored_libraries: Vec<PathBuf>,
    /// Prebuilt frameworks or xcframeworks shipped with the pod.
    pub vendored_frameworks: Vec<PathBuf>,
    /// Resource files or bundles.
    pub resources: Vec<PathBuf>,
}

/// A module whose merge was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedModule {
    /// Target the module belongs to.
    pub target: String,
    /// Root spec name.
    pub root_name: String,
    /// Why the module has no merged artifact.
    pub reason: SkipReason,
}

/// Why a module produced no merged artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The device product directory was absent.
    MissingDeviceProduct,
    /// The simulator product directory was absent.
    MissingSimulatorProduct,
    /// `-create-xcframework` ran but left no output.
    MergeProducedNoOutput,
}

/// Result of one configuration pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassReport {
    /// Configuration that was built.
    pub configuration: Configuration,
    /// `{root}/Rome/{Configuration}`.
    pub destination: PathBuf,
    /// Copied artifacts, as destination paths.
    pub artifacts: Vec<PathBuf>,
    /// Copied resources, as destination paths.
    pub resources: Vec<PathBuf>,
    /// Staged dSYM bundles, as destination paths.
    pub dsyms: Vec<PathBuf>,
    /// Modules that could not be merged.
    pub skipped: Vec<SkippedModule>,
}

/// Result of a full pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// One entry per configuration, in build order.
    pub passes: Vec<PassReport>,
}
