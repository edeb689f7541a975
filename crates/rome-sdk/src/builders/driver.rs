//! Per-target build driving.
//!
//! Paired platforms move through
//! `NotStarted → DeviceBuilt → SimulatorBuilt → Merged → Done`; the device
//! build always runs first. Native platforms go `NotStarted → Built → Done`.

use std::path::{Path, PathBuf};

use super::merge::{MergeOutcome, merge};
use super::xcodebuild::{BuildInvocation, BuildTool, BundleMerger};
use crate::layout::BuildLayout;
use crate::platform::{EnvironmentPair, Pairing, Platform, resolve};
use crate::types::{Configuration, RomeError, SkipReason, SkippedModule, Target};

/// Progress of one target through a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// Nothing has run yet.
    NotStarted,
    /// The device SDK build finished.
    DeviceBuilt,
    /// The simulator SDK build finished.
    SimulatorBuilt,
    /// Every mergeable module was merged.
    Merged,
    /// The single native build finished.
    Built,
    /// Nothing left to do.
    Done,
}

/// A target whose platform has been resolved.
#[derive(Debug, Clone)]
pub struct PlannedTarget<'a> {
    /// The installer's target.
    pub target: &'a Target,
    /// Resolved platform family.
    pub platform: Platform,
    /// Environments to build.
    pub pairing: Pairing,
}

/// Resolves every target's platform before anything is built.
///
/// Targets without module specs are dropped. An unknown platform aborts the
/// whole plan.
pub fn plan(targets: &[Target]) -> Result<Vec<PlannedTarget<'_>>, RomeError> {
    targets
        .iter()
        .filter(|target| !target.specs.is_empty())
        .map(|target| {
            let (platform, pairing) = resolve(&target.platform)?;
            Ok(PlannedTarget {
                target,
                platform,
                pairing,
            })
        })
        .collect()
}

/// What driving one target produced.
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    /// Target label.
    pub label: String,
    /// Final state, always [`BuildState::Done`] on success.
    pub state: BuildState,
    /// Merged xcframeworks.
    pub merged: Vec<PathBuf>,
    /// Modules without a merged xcframework.
    pub skipped: Vec<SkippedModule>,
}

/// Builds targets into the scratch directory and merges their products.
pub struct TargetDriver<'a> {
    layout: &'a BuildLayout,
    project: &'a Path,
    build_tool: &'a dyn BuildTool,
    merger: &'a dyn BundleMerger,
}

impl<'a> TargetDriver<'a> {
    /// Creates a driver writing into `layout`'s scratch directory.
    pub fn new(
        layout: &'a BuildLayout,
        project: &'a Path,
        build_tool: &'a dyn BuildTool,
        merger: &'a dyn BundleMerger,
    ) -> Self {
        Self {
            layout,
            project,
            build_tool,
            merger,
        }
    }

    /// The invocation used for `target` in `environment`.
    pub fn invocation(
        &self,
        target: &Target,
        environment: &str,
        configuration: Configuration,
    ) -> BuildInvocation {
        BuildInvocation::new(self.project, target, environment, configuration)
            .setting("SYMROOT", self.layout.scratch_dir().display().to_string())
    }

    /// Drives one target through its states.
    ///
    /// A failed build is returned as an error; the caller aborts the pass.
    pub fn drive(
        &self,
        planned: &PlannedTarget<'_>,
        configuration: Configuration,
    ) -> Result<TargetOutcome, RomeError> {
        let target = planned.target;
        let mut outcome = TargetOutcome {
            label: target.label.clone(),
            state: BuildState::NotStarted,
            merged: Vec::new(),
            skipped: Vec::new(),
        };

        match planned.pairing {
            Pairing::Paired(pair) => self.drive_paired(target, pair, configuration, &mut outcome)?,
            Pairing::Native { environment } => {
                tracing::info!(
                    scheme = %target.label,
                    "Building {} {} for {}",
                    configuration,
                    target.label,
                    environment
                );
                self.build_tool
                    .build(&self.invocation(target, environment, configuration))?;
                advance(&mut outcome, BuildState::Built);
            }
        }

        advance(&mut outcome, BuildState::Done);
        Ok(outcome)
    }

    fn drive_paired(
        &self,
        target: &Target,
        pair: EnvironmentPair,
        configuration: Configuration,
        outcome: &mut TargetOutcome,
    ) -> Result<(), RomeError> {
        tracing::info!(scheme = %target.label, "Building {} {} for device", configuration, target.label);
        self.build_tool
            .build(&self.invocation(target, pair.device, configuration))?;
        advance(outcome, BuildState::DeviceBuilt);

        tracing::info!(scheme = %target.label, "Building {} {} for simulator", configuration, target.label);
        self.build_tool
            .build(&self.invocation(target, pair.simulator, configuration))?;
        advance(outcome, BuildState::SimulatorBuilt);

        for spec in target.unique_modules() {
            let device = self.layout.product_path(
                configuration,
                pair.device,
                &spec.root_name,
                &spec.module_name,
            );
            let simulator = self.layout.product_path(
                configuration,
                pair.simulator,
                &spec.root_name,
                &spec.module_name,
            );

            let missing = if !device.is_dir() {
                Some(SkipReason::MissingDeviceProduct)
            } else if !simulator.is_dir() {
                Some(SkipReason::MissingSimulatorProduct)
            } else {
                None
            };
            if let Some(reason) = missing {
                tracing::debug!(
                    root = %spec.root_name,
                    module = %spec.module_name,
                    ?reason,
                    "skipping merge"
                );
                outcome.skipped.push(SkippedModule {
                    target: target.label.clone(),
                    root_name: spec.root_name.clone(),
                    reason,
                });
                continue;
            }

            tracing::info!(root = %spec.root_name, "Creating the xcframework for {}", spec.root_name);
            let output = self.layout.xcframework_path(&spec.root_name);
            match merge(self.merger, &device, &simulator, &output)? {
                MergeOutcome::Created(path) | MergeOutcome::Reused(path) => {
                    outcome.merged.push(path)
                }
                MergeOutcome::NoOutput { .. } => outcome.skipped.push(SkippedModule {
                    target: target.label.clone(),
                    root_name: spec.root_name.clone(),
                    reason: SkipReason::MergeProducedNoOutput,
                }),
            }
        }
        advance(outcome, BuildState::Merged);
        Ok(())
    }
}

fn advance(outcome: &mut TargetOutcome, next: BuildState) {
    tracing::debug!(scheme = %outcome.label, from = ?outcome.state, to = ?next, "state");
    outcome.state = next;
}
