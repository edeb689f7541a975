//! Debug symbol staging.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::builders::common::copy_replacing;
use crate::layout::BuildLayout;
use crate::types::{Configuration, RomeError};

fn is_dsym(name: &str) -> bool {
    name.ends_with(".dSYM")
}

/// Finds `*.dSYM` bundles anywhere under `dir`, without looking inside them.
///
/// A missing directory yields nothing.
pub fn find_dsyms(dir: &Path) -> Result<Vec<PathBuf>, RomeError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    let mut walker = WalkDir::new(dir).min_depth(1).sort_by_file_name().into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|e| RomeError::Io(e.into()))?;
        if entry.file_type().is_dir() && is_dsym(&entry.file_name().to_string_lossy()) {
            found.push(entry.into_path());
            walker.skip_current_dir();
        }
    }
    Ok(found)
}

/// Copies the dSYMs built for each environment to `{root}/dSYM/{environment}`.
///
/// Existing bundles of the same name are replaced. Returns the staged paths.
pub fn stage_debug_symbols(
    layout: &BuildLayout,
    configuration: Configuration,
    environments: &[&str],
) -> Result<Vec<PathBuf>, RomeError> {
    let mut staged = Vec::new();

    for environment in environments {
        let dsyms = find_dsyms(&layout.products_dir(configuration, environment))?;
        if dsyms.is_empty() {
            tracing::debug!(%configuration, environment, "no dSYM bundles");
            continue;
        }

        let before = staged.len();
        let destination = layout.dsym_destination(environment);
        fs::create_dir_all(&destination)
            .map_err(|e| RomeError::fs("create directory", &destination, e))?;
        for dsym in dsyms {
            staged.push(copy_replacing(&dsym, &destination)?);
        }
        tracing::info!(
            %configuration,
            environment,
            count = staged.len() - before,
            "staged debug symbols to {}",
            destination.display()
        );
    }

    Ok(staged)
}
