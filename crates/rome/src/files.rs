//! Module file lookup backed by the manifest.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rome_sdk::{FileAccessor, ModuleFiles, ModuleSpec, Platform, RomeError};

use crate::config::RomeManifest;

/// Serves the vendored files the manifest declares for each spec.
///
/// Paths are relative to `<sandbox_root>/<root>`. Declared paths that do not
/// exist are logged and left out.
#[derive(Debug, Default)]
pub struct ManifestFiles {
    files: HashMap<ModuleSpec, ModuleFiles>,
}

impl ManifestFiles {
    /// Indexes every spec of every target.
    pub fn new(manifest: &RomeManifest, sandbox_root: &Path) -> Self {
        let mut files: HashMap<ModuleSpec, ModuleFiles> = HashMap::new();

        for spec in manifest.targets.iter().flat_map(|t| &t.specs) {
            let pod_dir = sandbox_root.join(&spec.root);
            let entry = files.entry(spec.module_spec()).or_default();
            extend_unique(&mut entry.vendored_libraries, &pod_dir, &spec.vendored_libraries);
            extend_unique(&mut entry.vendored_frameworks, &pod_dir, &spec.vendored_frameworks);
            extend_unique(&mut entry.resources, &pod_dir, &spec.resources);
        }

        Self { files }
    }
}

fn extend_unique(into: &mut Vec<PathBuf>, base: &Path, relative: &[PathBuf]) {
    for path in relative {
        let path = base.join(path);
        if !into.contains(&path) {
            into.push(path);
        }
    }
}

fn existing(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .filter(|path| {
            let exists = path.exists();
            if !exists {
                tracing::warn!(path = ?path, "declared file does not exist, skipping");
            }
            exists
        })
        .cloned()
        .collect()
}

impl FileAccessor for ManifestFiles {
    fn files(&self, spec: &ModuleSpec, platform: Platform) -> Result<ModuleFiles, RomeError> {
        let Some(declared) = self.files.get(spec) else {
            return Ok(ModuleFiles::default());
        };
        tracing::debug!(root = %spec.root_name, platform = platform.as_str(), "resolving vendored files");

        Ok(ModuleFiles {
            vendored_libraries: existing(&declared.vendored_libraries),
            vendored_frameworks: existing(&declared.vendored_frameworks),
            resources: existing(&declared.resources),
        })
    }
}
