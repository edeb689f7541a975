//! `xcodebuild` invocation.
//!
//! [`BuildTool`] and [`BundleMerger`] are the two seams between the pipeline
//! and Xcode. [`Xcodebuild`] implements both by shelling out.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::common::{OUTPUT_TAIL_LINES, output_tail, run_command};
use super::simctl::{self, Destination};
use crate::platform;
use crate::types::{Configuration, RomeError, Target};

/// One `xcodebuild` build of a scheme for one SDK and configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInvocation {
    /// Xcode project to build.
    pub project: PathBuf,
    /// Scheme (target label).
    pub scheme: String,
    /// Build configuration.
    pub configuration: Configuration,
    /// SDK / environment name (`iphoneos`, `iphonesimulator`, `macosx`, ...).
    pub sdk: String,
    /// Minimum OS version, used to choose a simulator destination.
    pub deployment_target: Option<String>,
    /// Extra `KEY=VALUE` build settings, in order.
    pub settings: Vec<String>,
}

impl BuildInvocation {
    /// Creates an invocation for `target` in `environment`.
    pub fn new(
        project: impl Into<PathBuf>,
        target: &Target,
        environment: &str,
        configuration: Configuration,
    ) -> Self {
        Self {
            project: project.into(),
            scheme: target.label.clone(),
            configuration,
            sdk: environment.to_string(),
            deployment_target: target.deployment_target.clone(),
            settings: Vec::new(),
        }
    }

    /// Appends a `KEY=VALUE` build setting.
    pub fn setting(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.settings.push(format!("{}={}", key, value.as_ref()));
        self
    }

    /// Platform label when this is a simulator build.
    pub fn simulator_label(&self) -> Option<&'static str> {
        platform::simulator_label(&self.sdk)
    }
}

/// Builds a scheme. A non-zero exit must be returned as [`RomeError::BuildFailed`].
pub trait BuildTool {
    /// Runs one build to completion.
    fn build(&self, invocation: &BuildInvocation) -> Result<(), RomeError>;
}

/// Creates a multi-environment xcframework from per-environment frameworks.
///
/// Implementations return whatever the tool printed. Whether the merge worked
/// is decided by the caller from the existence of `output`.
pub trait BundleMerger {
    /// Merges `frameworks` into `output`.
    fn create_xcframework(&self, frameworks: &[PathBuf], output: &Path)
    -> Result<String, RomeError>;
}

/// The real Xcode toolchain.
#[derive(Debug, Clone)]
pub struct Xcodebuild {
    program: String,
    xcconfig: Option<PathBuf>,
    resolve_destinations: bool,
}

impl Default for Xcodebuild {
    fn default() -> Self {
        Self::new()
    }
}

impl Xcodebuild {
    /// Uses `xcodebuild` from `PATH`.
    pub fn new() -> Self {
        Self {
            program: "xcodebuild".to_string(),
            xcconfig: None,
            resolve_destinations: true,
        }
    }

    /// Passes `-xcconfig <path>` to every build.
    pub fn xcconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.xcconfig = Some(path.into());
        self
    }

    /// Disables the `simctl` lookup; simulator builds use a generic destination.
    pub fn resolve_destinations(mut self, resolve: bool) -> Self {
        self.resolve_destinations = resolve;
        self
    }

    /// Destination for an invocation, `None` for device and native builds.
    pub fn destination(&self, invocation: &BuildInvocation) -> Option<Destination> {
        let label = invocation.simulator_label()?;
        if self.resolve_destinations {
            Some(simctl::oldest_destination(
                label,
                invocation.deployment_target.as_deref(),
            ))
        } else {
            Some(Destination::Generic {
                label: label.to_string(),
            })
        }
    }

    /// Arguments for a build, without the program name.
    pub fn build_args(
        &self,
        invocation: &BuildInvocation,
        destination: Option<&Destination>,
    ) -> Vec<String> {
        let project =
            std::path::absolute(&invocation.project).unwrap_or_else(|_| invocation.project.clone());

        let mut args = vec![
            "-project".to_string(),
            project.display().to_string(),
            "-scheme".to_string(),
            invocation.scheme.clone(),
            "-configuration".to_string(),
            invocation.configuration.as_str().to_string(),
            "-sdk".to_string(),
            invocation.sdk.clone(),
        ];
        if let Some(xcconfig) = &self.xcconfig {
            args.push("-xcconfig".to_string());
            args.push(xcconfig.display().to_string());
        }
        args.extend(invocation.settings.iter().cloned());
        if let Some(destination) = destination {
            args.push("-destination".to_string());
            args.push(destination.as_arg());
        }
        args
    }

    /// Arguments for `-create-xcframework`, without the program name.
    pub fn create_xcframework_args(frameworks: &[PathBuf], output: &Path) -> Vec<String> {
        let mut args = vec!["-create-xcframework".to_string()];
        for framework in frameworks {
            args.push("-framework".to_string());
            args.push(framework.display().to_string());
        }
        args.push("-output".to_string());
        args.push(output.display().to_string());
        args
    }
}

impl BuildTool for Xcodebuild {
    fn build(&self, invocation: &BuildInvocation) -> Result<(), RomeError> {
        let destination = self.destination(invocation);
        let args = self.build_args(invocation, destination.as_ref());
        tracing::info!(
            scheme = %invocation.scheme,
            sdk = %invocation.sdk,
            configuration = %invocation.configuration,
            "xcodebuild {}",
            args.join(" ")
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&args);
        let output = run_command(cmd, &self.program)?;

        if !output.status.success() {
            return Err(RomeError::BuildFailed {
                scheme: invocation.scheme.clone(),
                sdk: invocation.sdk.clone(),
                configuration: invocation.configuration.to_string(),
                status: output.status.to_string(),
                output: output_tail(&output, OUTPUT_TAIL_LINES),
            });
        }
        Ok(())
    }
}

impl BundleMerger for Xcodebuild {
    fn create_xcframework(
        &self,
        frameworks: &[PathBuf],
        output: &Path,
    ) -> Result<String, RomeError> {
        let args = Self::create_xcframework_args(frameworks, output);
        tracing::info!("xcodebuild {}", args.join(" "));

        let mut cmd = Command::new(&self.program);
        cmd.args(&args);
        let result = run_command(cmd, &self.program)?;

        let mut log = String::from_utf8_lossy(&result.stdout).into_owned();
        log.push_str(&String::from_utf8_lossy(&result.stderr));
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModuleSpec;

    fn target(platform: &str) -> Target {
        Target {
            label: "Pods-App".to_string(),
            platform: platform.to_string(),
            deployment_target: Some("15.0".to_string()),
            specs: vec![ModuleSpec::named("Alpha")],
        }
    }

    #[test]
    fn test_device_build_args_have_no_destination() {
        let invocation = BuildInvocation::new(
            "/work/App/Pods/Pods.xcodeproj",
            &target("ios"),
            "iphoneos",
            Configuration::Debug,
        )
        .setting("SYMROOT", "/work/App/build");
        let xcodebuild = Xcodebuild::new();

        assert!(xcodebuild.destination(&invocation).is_none());
        let args = xcodebuild.build_args(&invocation, None);
        assert_eq!(
            args,
            vec![
                "-project",
                "/work/App/Pods/Pods.xcodeproj",
                "-scheme",
                "Pods-App",
                "-configuration",
                "Debug",
                "-sdk",
                "iphoneos",
                "SYMROOT=/work/App/build",
            ]
        );
    }

    #[test]
    fn test_simulator_build_gets_destination() {
        let invocation = BuildInvocation::new(
            "/work/App/Pods/Pods.xcodeproj",
            &target("tvos"),
            "appletvsimulator",
            Configuration::Release,
        );
        let xcodebuild = Xcodebuild::new()
            .resolve_destinations(false)
            .xcconfig("/work/App/Pods/Rome.xcconfig");

        let destination = xcodebuild.destination(&invocation);
        assert_eq!(
            destination,
            Some(Destination::Generic {
                label: "tvOS".to_string()
            })
        );

        let args = xcodebuild.build_args(&invocation, destination.as_ref());
        let xcconfig_at = args.iter().position(|a| a == "-xcconfig").unwrap();
        assert_eq!(args[xcconfig_at + 1], "/work/App/Pods/Rome.xcconfig");
        assert_eq!(
            &args[args.len() - 2..],
            &["-destination", "generic/platform=tvOS Simulator"]
        );
    }

    #[test]
    fn test_create_xcframework_args() {
        let args = Xcodebuild::create_xcframework_args(
            &[
                PathBuf::from("build/Debug-iphoneos/Alpha/Alpha.framework"),
                PathBuf::from("build/Debug-iphonesimulator/Alpha/Alpha.framework"),
            ],
            Path::new("build/Alpha.xcframework"),
        );
        assert_eq!(
            args,
            vec![
                "-create-xcframework",
                "-framework",
                "build/Debug-iphoneos/Alpha/Alpha.framework",
                "-framework",
                "build/Debug-iphonesimulator/Alpha/Alpha.framework",
                "-output",
                "build/Alpha.xcframework",
            ]
        );
    }
}
