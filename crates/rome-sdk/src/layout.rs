//! Filesystem layout of a run.
//!
//! ```text
//! {root}/
//! ├── build/                                  # scratch, removed after every pass
//! │   ├── {Configuration}-{environment}/
//! │   │   └── {rootName}/{moduleName}.framework
//! │   └── {rootName}.xcframework
//! ├── Rome/{Configuration}/                   # artifacts and resources
//! └── dSYM/{environment}/                     # debug symbols
//! ```
//!
//! `xcodebuild` writes the per-environment products itself (we pass
//! `SYMROOT={root}/build`); every other component reads paths from here.

use std::path::{Path, PathBuf};

use crate::types::Configuration;

/// Paths derived from the output root (the parent of the `Pods` sandbox).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    root: PathBuf,
}

impl BuildLayout {
    /// Creates a layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Output root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Transient build directory, used as `SYMROOT`.
    pub fn scratch_dir(&self) -> PathBuf {
        self.root.join("build")
    }

    /// Products directory of one configuration/environment build.
    pub fn products_dir(&self, configuration: Configuration, environment: &str) -> PathBuf {
        self.scratch_dir()
            .join(format!("{}-{}", configuration.as_str(), environment))
    }

    /// Framework `xcodebuild` produces for a module in one environment.
    pub fn product_path(
        &self,
        configuration: Configuration,
        environment: &str,
        root_name: &str,
        module_name: &str,
    ) -> PathBuf {
        self.products_dir(configuration, environment)
            .join(root_name)
            .join(format!("{}.framework", module_name))
    }

    /// Merged xcframework for a root spec.
    pub fn xcframework_path(&self, root_name: &str) -> PathBuf {
        self.scratch_dir().join(format!("{}.xcframework", root_name))
    }

    /// `{root}/Rome`, wiped once at the start of a run.
    pub fn rome_dir(&self) -> PathBuf {
        self.root.join("Rome")
    }

    /// Where a configuration's artifacts and resources are copied.
    pub fn destination(&self, configuration: Configuration) -> PathBuf {
        self.rome_dir().join(configuration.as_str())
    }

    /// `{root}/dSYM`.
    pub fn dsym_dir(&self) -> PathBuf {
        self.root.join("dSYM")
    }

    /// Where dSYM bundles built for `environment` are staged.
    pub fn dsym_destination(&self, environment: &str) -> PathBuf {
        self.dsym_dir().join(environment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_path_convention() {
        let layout = BuildLayout::new("/work/App");
        assert_eq!(
            layout.product_path(Configuration::Debug, "iphoneos", "React-Core", "React"),
            PathBuf::from("/work/App/build/Debug-iphoneos/React-Core/React.framework")
        );
        assert_eq!(
            layout.product_path(Configuration::Release, "iphonesimulator", "Alpha", "Alpha"),
            PathBuf::from("/work/App/build/Release-iphonesimulator/Alpha/Alpha.framework")
        );
    }

    #[test]
    fn test_merged_and_destination_paths() {
        let layout = BuildLayout::new("/work/App");
        assert_eq!(
            layout.xcframework_path("Alpha"),
            PathBuf::from("/work/App/build/Alpha.xcframework")
        );
        assert_eq!(
            layout.destination(Configuration::Release),
            PathBuf::from("/work/App/Rome/Release")
        );
        assert_eq!(
            layout.dsym_destination("iphonesimulator"),
            PathBuf::from("/work/App/dSYM/iphonesimulator")
        );
    }
}
