//! Device + simulator framework merging.

use std::path::{Path, PathBuf};

use super::xcodebuild::BundleMerger;
use crate::types::RomeError;

/// What a merge left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The xcframework was created by this call.
    Created(PathBuf),
    /// The xcframework already existed (another target merged the same root
    /// spec earlier in the pass) and is still there.
    Reused(PathBuf),
    /// No xcframework exists after the tool ran.
    NoOutput {
        /// Captured tool output.
        log: String,
    },
}

impl MergeOutcome {
    /// Path of the merged bundle, if there is one.
    pub fn artifact(&self) -> Option<&Path> {
        match self {
            MergeOutcome::Created(path) | MergeOutcome::Reused(path) => Some(path),
            MergeOutcome::NoOutput { .. } => None,
        }
    }
}

/// Merges a device and a simulator framework into `output`.
///
/// The tool is invoked even when `output` already exists; afterwards only the
/// existence of `output` is checked. Errors are returned only when the tool
/// cannot be started.
pub fn merge(
    merger: &dyn BundleMerger,
    device: &Path,
    simulator: &Path,
    output: &Path,
) -> Result<MergeOutcome, RomeError> {
    let existed = output.exists();
    if existed {
        tracing::debug!(output = ?output, "xcframework already present, merging anyway");
    }

    let log = merger.create_xcframework(&[device.to_path_buf(), simulator.to_path_buf()], output)?;

    if !output.exists() {
        tracing::warn!(
            output = ?output,
            "xcodebuild -create-xcframework produced no output:\n{}",
            log.trim()
        );
        return Ok(MergeOutcome::NoOutput { log });
    }

    Ok(if existed {
        MergeOutcome::Reused(output.to_path_buf())
    } else {
        MergeOutcome::Created(output.to_path_buf())
    })
}
