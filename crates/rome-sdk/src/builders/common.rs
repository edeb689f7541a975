//! Common utilities shared by the xcodebuild invoker, the merger and the
//! artifact collector.
//!
//! ## Features
//!
//! - **Consistent command execution** - spawn failures become
//!   [`RomeError::ToolUnavailable`], output is always captured
//! - **Replacing copies** - `cp -R` with the destination removed first, so a
//!   later copy always wins over an earlier one at the same path
//! - **Symlink preservation** - framework bundles keep their `Versions/Current`
//!   links

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::types::RomeError;

/// Number of output lines kept in build failure messages.
pub const OUTPUT_TAIL_LINES: usize = 40;

/// Runs an external command and captures its output.
///
/// The exit status is not inspected; callers decide whether a non-zero exit is
/// fatal (`xcodebuild build`) or only a hint (`-create-xcframework`).
///
/// # Arguments
/// * `cmd` - The command to execute
/// * `tool` - Program name used in the error if the command cannot start
pub fn run_command(mut cmd: Command, tool: &str) -> Result<Output, RomeError> {
    tracing::debug!(command = ?cmd, "running");
    cmd.output().map_err(|source| RomeError::ToolUnavailable {
        tool: tool.to_string(),
        source,
    })
}

/// Returns the last `lines` lines of stdout followed by stderr.
pub fn output_tail(output: &Output, lines: usize) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let start = combined.len().saturating_sub(lines);
    combined[start..].join("\n")
}

/// Removes a file, symlink or directory tree if something exists at `path`.
pub fn remove_path(path: &Path) -> Result<(), RomeError> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(RomeError::fs("inspect", path, e)),
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| RomeError::fs("remove", path, e))
}

/// Copies `src` into `dest_dir`, replacing whatever is already at
/// `dest_dir/<file name>`.
///
/// A symlinked `src` is copied as the content it points at. Symlinks inside a
/// copied directory are recreated as links.
///
/// Returns the destination path.
pub fn copy_replacing(src: &Path, dest_dir: &Path) -> Result<PathBuf, RomeError> {
    let file_name = src.file_name().ok_or_else(|| {
        RomeError::fs(
            "copy",
            src,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })?;
    let dest = dest_dir.join(file_name);

    let is_link = fs::symlink_metadata(src)
        .map_err(|e| RomeError::fs("read", src, e))?
        .file_type()
        .is_symlink();
    let root = if is_link {
        fs::canonicalize(src).map_err(|e| RomeError::fs("resolve", src, e))?
    } else {
        src.to_path_buf()
    };

    remove_path(&dest)?;
    copy_recursive(&root, &dest)?;
    Ok(dest)
}

/// Recursively copies a file, directory or symlink.
fn copy_recursive(src: &Path, dest: &Path) -> Result<(), RomeError> {
    let metadata = fs::symlink_metadata(src).map_err(|e| RomeError::fs("read", src, e))?;

    if metadata.file_type().is_symlink() {
        return copy_symlink(src, dest);
    }

    if metadata.is_dir() {
        fs::create_dir_all(dest).map_err(|e| RomeError::fs("create directory", dest, e))?;
        for entry in fs::read_dir(src).map_err(|e| RomeError::fs("read directory", src, e))? {
            let entry = entry.map_err(|e| RomeError::fs("read directory", src, e))?;
            copy_recursive(&entry.path(), &dest.join(entry.file_name()))?;
        }
        return Ok(());
    }

    fs::copy(src, dest).map_err(|e| RomeError::fs("copy", src, e))?;
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dest: &Path) -> Result<(), RomeError> {
    let target = fs::read_link(src).map_err(|e| RomeError::fs("read link", src, e))?;
    std::os::unix::fs::symlink(&target, dest).map_err(|e| RomeError::fs("link", dest, e))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dest: &Path) -> Result<(), RomeError> {
    // No portable symlink creation; copy what the link points at.
    let resolved = fs::canonicalize(src).map_err(|e| RomeError::fs("resolve", src, e))?;
    copy_recursive(&resolved, dest)
}
