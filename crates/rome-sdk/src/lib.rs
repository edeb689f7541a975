//! Prebuilt framework pipeline for CocoaPods installations.
//!
//! `rome-sdk` builds every pod target of an installation with `xcodebuild`,
//! merges the device and simulator frameworks of each module into an
//! `.xcframework`, and stages the results next to the `Pods` sandbox:
//!
//! ```text
//! {root}/Rome/{Configuration}/   merged bundles, vendored binaries, resources
//! {root}/dSYM/{environment}/     debug symbols
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use rome_sdk::builders::Xcodebuild;
//! use rome_sdk::{HookOptions, InstallerContext, ProjectModel, Rome, XcconfigProject};
//!
//! fn main() -> Result<(), rome_sdk::RomeError> {
//!     let context = InstallerContext::new("Pods", targets);
//!     let xcodebuild = Xcodebuild::new().xcconfig("Pods/Rome.xcconfig");
//!     let mut project = XcconfigProject::open("Pods/Rome.xcconfig".as_ref())?;
//!
//!     let report = Rome::new(&xcodebuild, &xcodebuild)
//!         .options(HookOptions::default())
//!         .run(&context, &accessor, &mut project)?;
//!
//!     for pass in &report.passes {
//!         println!("{}: {} artifacts", pass.configuration, pass.artifacts.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Platform**: maps a platform tag to its device/simulator environments
//! - **Builders**: drive `xcodebuild` per environment and merge the products
//! - **Collect**: discovers, deduplicates and copies artifacts
//! - **Dsym**: stages debug symbol bundles
//! - **Project**: toggles build settings before each pass
//! - **Pipeline**: the [`Rome`] orchestrator tying everything together

// Public modules
pub mod builders;
pub mod collect;
pub mod dsym;
pub mod layout;
pub mod options;
pub mod pipeline;
pub mod platform;
pub mod project;
pub mod types;

#[cfg(test)]
mod testutil;

// Re-export key types for convenience
pub use collect::{ArtifactSet, FileAccessor};
pub use layout::BuildLayout;
pub use options::{Hook, HookOptions};
pub use pipeline::Rome;
pub use platform::{EnvironmentPair, Pairing, Platform};
pub use project::{ProjectModel, XcconfigProject};
pub use types::{
    Configuration, ConfigurationSelection, InstallerContext, ModuleFiles, ModuleSpec, PassReport,
    RomeError, RunReport, SkipReason, SkippedModule, Target,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
