//! The post-install orchestrator.
//!
//! [`Rome::run`] is the single entry point: it runs the pre-compile hook,
//! validates every target's platform, wipes `{root}/Rome` once and then runs
//! one pass per selected configuration before the post-compile hook.
//!
//! Each pass owns the scratch directory through a guard, so `build/` is gone
//! when the pass returns, whether it succeeded or not.

use std::path::{Path, PathBuf};

use crate::builders::common::remove_path;
use crate::builders::{BuildTool, BundleMerger, PlannedTarget, TargetDriver, plan};
use crate::collect::{FileAccessor, collect};
use crate::dsym::stage_debug_symbols;
use crate::layout::BuildLayout;
use crate::options::HookOptions;
use crate::project::{ProjectModel, configure_build_options, enable_debug_information};
use crate::types::{Configuration, InstallerContext, PassReport, RomeError, RunReport};

/// Removes the scratch directory when dropped.
struct ScratchGuard {
    path: PathBuf,
    armed: bool,
}

impl ScratchGuard {
    /// Clears whatever a previous run left at `path` and takes ownership of it.
    fn clear(path: PathBuf) -> Result<Self, RomeError> {
        remove_path(&path)?;
        Ok(Self { path, armed: true })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the directory, reporting failures.
    fn finish(mut self) -> Result<(), RomeError> {
        self.armed = false;
        remove_path(&self.path)
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = remove_path(&self.path) {
            tracing::warn!(path = ?self.path, error = %e, "failed to clean up build directory");
        }
    }
}

/// Builds, merges and stages every target of an installation.
///
/// # Example
///
/// ```ignore
/// use rome_sdk::{HookOptions, InstallerContext, Rome, XcconfigProject, ProjectModel};
/// use rome_sdk::builders::Xcodebuild;
///
/// let xcodebuild = Xcodebuild::new().xcconfig("Pods/Rome.xcconfig");
/// let mut project = XcconfigProject::open("Pods/Rome.xcconfig".as_ref())?;
/// let report = Rome::new(&xcodebuild, &xcodebuild)
///     .options(HookOptions::default())
///     .run(&context, &accessor, &mut project)?;
/// ```
pub struct Rome<'a> {
    build_tool: &'a dyn BuildTool,
    merger: &'a dyn BundleMerger,
    options: HookOptions,
}

impl<'a> Rome<'a> {
    /// Creates an orchestrator with default options.
    pub fn new(build_tool: &'a dyn BuildTool, merger: &'a dyn BundleMerger) -> Self {
        Self {
            build_tool,
            merger,
            options: HookOptions::default(),
        }
    }

    /// Replaces the hook options.
    pub fn options(mut self, options: HookOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs the whole pipeline.
    pub fn run(
        &self,
        context: &InstallerContext,
        files: &dyn FileAccessor,
        project: &mut dyn ProjectModel,
    ) -> Result<RunReport, RomeError> {
        if let Some(hook) = &self.options.pre_compile {
            tracing::info!("Running pre_compile hook");
            hook(context)?;
        }

        let planned = plan(&context.targets)?;
        let layout = BuildLayout::new(context.output_root());

        tracing::debug!(path = ?layout.rome_dir(), "clearing previous artifacts");
        remove_path(&layout.rome_dir())?;

        let mut report = RunReport::default();
        for configuration in self.options.configuration.configurations() {
            let pass = self.run_pass(&layout, context, &planned, files, project, configuration)?;
            report.passes.push(pass);
        }

        if let Some(hook) = &self.options.post_compile {
            tracing::info!("Running post_compile hook");
            hook(context)?;
        }

        Ok(report)
    }

    fn run_pass(
        &self,
        layout: &BuildLayout,
        context: &InstallerContext,
        planned: &[PlannedTarget<'_>],
        files: &dyn FileAccessor,
        project: &mut dyn ProjectModel,
        configuration: Configuration,
    ) -> Result<PassReport, RomeError> {
        tracing::info!(%configuration, targets = planned.len(), "Starting {} pass", configuration);

        if self.options.dsym {
            enable_debug_information(project, configuration)?;
        }
        configure_build_options(project, configuration)?;

        let scratch = ScratchGuard::clear(layout.scratch_dir())?;
        let driver = TargetDriver::new(layout, &context.project_path, self.build_tool, self.merger);

        let mut skipped = Vec::new();
        for target in planned {
            let outcome = driver.drive(target, configuration)?;
            skipped.extend(outcome.skipped);
        }

        if !scratch.path().is_dir() {
            return Err(RomeError::MissingBuildDirectory(scratch.path().to_path_buf()));
        }

        let destination = layout.destination(configuration);
        let copied = collect(layout, planned, files)?.copy_to(&destination)?;

        let dsyms = if self.options.dsym {
            stage_debug_symbols(layout, configuration, &environments(planned))?
        } else {
            Vec::new()
        };

        scratch.finish()?;

        tracing::info!(
            %configuration,
            artifacts = copied.artifacts.len(),
            resources = copied.resources.len(),
            dsyms = dsyms.len(),
            skipped = skipped.len(),
            "Copied artifacts to {}",
            destination.display()
        );

        Ok(PassReport {
            configuration,
            destination,
            artifacts: copied.artifacts,
            resources: copied.resources,
            dsyms,
            skipped,
        })
    }
}

/// Distinct environments built for `planned`, in first-use order.
fn environments(planned: &[PlannedTarget<'_>]) -> Vec<&'static str> {
    let mut environments = Vec::new();
    for target in planned {
        for environment in target.pairing.environments() {
            if !environments.contains(&environment) {
                environments.push(environment);
            }
        }
    }
    environments
}
