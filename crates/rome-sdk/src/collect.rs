//! Artifact discovery and staging.
//!
//! After a pass has built and merged every target, the collector gathers what
//! ends up in `Rome/{Configuration}`:
//!
//! 1. merged `*.xcframework` bundles found in the scratch directory, two
//!    levels deep first (`build/*/*/`) then at the top (`build/`), skipping
//!    the `Pods-*` umbrella bundles;
//! 2. every module spec's vendored libraries, vendored frameworks and
//!    resources, as reported by a [`FileAccessor`].
//!
//! Both lists are deduplicated by resolved path, first occurrence wins, and
//! then copied in order. A later copy to the same destination name replaces
//! the earlier one, which is how device products take precedence over
//! simulator products.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::builders::PlannedTarget;
use crate::builders::common::copy_replacing;
use crate::layout::BuildLayout;
use crate::platform::{Platform, is_simulator};
use crate::types::{ModuleFiles, ModuleSpec, RomeError};

/// Source of the files a module spec ships pre-built.
pub trait FileAccessor {
    /// Vendored libraries, vendored frameworks and resources of `spec` for
    /// `platform`.
    fn files(&self, spec: &ModuleSpec, platform: Platform) -> Result<ModuleFiles, RomeError>;
}

/// Deduplicated artifacts and resources, in copy order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSet {
    /// Bundles and binaries.
    pub artifacts: Vec<PathBuf>,
    /// Resource files and bundles.
    pub resources: Vec<PathBuf>,
}

impl ArtifactSet {
    /// Number of entries across both lists.
    pub fn len(&self) -> usize {
        self.artifacts.len() + self.resources.len()
    }

    /// Whether nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies artifacts, then resources, into `destination`.
    ///
    /// Returns the set of copied paths inside `destination`, each listed once
    /// under the entry that was copied there last.
    pub fn copy_to(&self, destination: &Path) -> Result<ArtifactSet, RomeError> {
        fs::create_dir_all(destination)
            .map_err(|e| RomeError::fs("create directory", destination, e))?;

        let mut copied = ArtifactSet::default();
        for artifact in &self.artifacts {
            tracing::debug!(from = ?artifact, to = ?destination, "copying artifact");
            let dest = copy_replacing(artifact, destination)?;
            copied.forget(&dest);
            copied.artifacts.push(dest);
        }
        for resource in &self.resources {
            tracing::debug!(from = ?resource, to = ?destination, "copying resource");
            let dest = copy_replacing(resource, destination)?;
            copied.forget(&dest);
            copied.resources.push(dest);
        }
        Ok(copied)
    }

    fn forget(&mut self, path: &Path) {
        self.artifacts.retain(|p| p != path);
        self.resources.retain(|p| p != path);
    }
}

/// Whether `path` is, or lives inside, a `Pods-*` umbrella framework.
pub fn is_umbrella(path: &Path) -> bool {
    path.components().any(|component| {
        let name = component.as_os_str().to_string_lossy();
        let stem = name
            .strip_suffix(".xcframework")
            .or_else(|| name.strip_suffix(".framework"));
        match stem.and_then(|stem| stem.strip_prefix("Pods")) {
            Some(rest) => !rest.is_empty() && !rest.contains('.'),
            None => false,
        }
    })
}

/// Merged bundles under the scratch directory, in discovery order.
///
/// Depth-two bundles come first, those under simulator product directories
/// ahead of device ones. A missing scratch directory yields nothing.
pub fn discover_bundles(scratch: &Path) -> Result<Vec<PathBuf>, RomeError> {
    if !scratch.is_dir() {
        return Ok(Vec::new());
    }

    let mut nested = find_xcframeworks(scratch, 3)?;
    // Stable sort keeps lexicographic order inside each group.
    nested.sort_by_key(|path| !is_under_simulator_products(scratch, path));

    let mut bundles = nested;
    bundles.extend(find_xcframeworks(scratch, 1)?);
    bundles.retain(|path| {
        let keep = !is_umbrella(path);
        if !keep {
            tracing::debug!(path = ?path, "skipping umbrella bundle");
        }
        keep
    });
    Ok(bundles)
}

fn find_xcframeworks(root: &Path, depth: usize) -> Result<Vec<PathBuf>, RomeError> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(depth)
        .max_depth(depth)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| RomeError::Io(e.into()))?;
        let is_bundle = entry
            .file_name()
            .to_string_lossy()
            .ends_with(".xcframework");
        if is_bundle && entry.path().is_dir() {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

/// `build/{Configuration}-{environment}/...` with a simulator environment.
fn is_under_simulator_products(scratch: &Path, path: &Path) -> bool {
    path.strip_prefix(scratch)
        .ok()
        .and_then(|relative| relative.components().next())
        .map(|dir| dir.as_os_str().to_string_lossy().into_owned())
        .and_then(|dir| dir.split_once('-').map(|(_, env)| is_simulator(env)))
        .unwrap_or(false)
}

/// Collects everything a pass should ship.
pub fn collect(
    layout: &BuildLayout,
    targets: &[PlannedTarget<'_>],
    accessor: &dyn FileAccessor,
) -> Result<ArtifactSet, RomeError> {
    let mut artifacts = discover_bundles(&layout.scratch_dir())?;
    let mut resources = Vec::new();

    for planned in targets {
        for spec in &planned.target.specs {
            let ModuleFiles {
                vendored_libraries,
                vendored_frameworks,
                resources: spec_resources,
            } = accessor.files(spec, planned.platform)?;
            artifacts.extend(vendored_libraries);
            artifacts.extend(vendored_frameworks);
            resources.extend(spec_resources);
        }
    }

    let set = ArtifactSet {
        artifacts: dedup_by_resolved_path(artifacts),
        resources: dedup_by_resolved_path(resources),
    };
    tracing::info!(
        artifacts = set.artifacts.len(),
        resources = set.resources.len(),
        "collected artifacts"
    );
    Ok(set)
}

/// Drops later entries that resolve to an already seen path.
pub fn dedup_by_resolved_path(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|path| {
            let resolved = fs::canonicalize(path).unwrap_or_else(|_| path.clone());
            seen.insert(resolved)
        })
        .collect()
}
