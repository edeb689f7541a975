//! Build automation for pod targets.
//!
//! This module drives `xcodebuild` for each environment of a target and merges
//! the resulting frameworks into xcframeworks.
//!
//! ## Overview
//!
//! 1. **Planning** - Resolve every target's platform family ([`plan`])
//! 2. **Building** - Device SDK, then simulator SDK ([`TargetDriver`])
//! 3. **Merging** - `xcodebuild -create-xcframework` per unique module ([`merge()`])
//!
//! | Platform | Environments | Output |
//! |----------|--------------|--------|
//! | iOS | `iphoneos` + `iphonesimulator` | xcframework |
//! | tvOS | `appletvos` + `appletvsimulator` | xcframework |
//! | watchOS | `watchos` + `watchsimulator` | xcframework |
//! | macOS | `macosx` | framework |
//!
//! ## Seams
//!
//! [`BuildTool`] and [`BundleMerger`] abstract the external tool so the
//! pipeline can be exercised without Xcode. [`Xcodebuild`] is the real
//! implementation of both.
//!
//! ## Example
//!
//! ```ignore
//! use rome_sdk::builders::{TargetDriver, Xcodebuild, plan};
//! use rome_sdk::{BuildLayout, Configuration};
//!
//! let xcodebuild = Xcodebuild::new();
//! let layout = BuildLayout::new("/work/App");
//! let driver = TargetDriver::new(&layout, project_path, &xcodebuild, &xcodebuild);
//! for planned in plan(&context.targets)? {
//!     driver.drive(&planned, Configuration::Debug)?;
//! }
//! # Ok::<(), rome_sdk::RomeError>(())
//! ```

pub mod common;
pub mod driver;
pub mod merge;
pub mod simctl;
pub mod xcodebuild;

// Re-export builders
pub use driver::{BuildState, PlannedTarget, TargetDriver, TargetOutcome, plan};
pub use merge::{MergeOutcome, merge};
pub use simctl::{Destination, OsVersion, Simulator};
pub use xcodebuild::{BuildInvocation, BuildTool, BundleMerger, Xcodebuild};
