//! Platform families and the environments `xcodebuild` builds them for.
//!
//! Every platform family except macOS has a device SDK and a simulator SDK.
//! Their products are merged into one xcframework. macOS builds once against
//! its native SDK.

use std::fmt;

use crate::types::RomeError;

/// A platform family as declared by a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// iPhone and iPad.
    Ios,
    /// Desktop macOS. Has no simulator.
    Macos,
    /// Apple TV.
    Tvos,
    /// Apple Watch.
    Watchos,
}

/// Device SDK, simulator SDK and the platform name `simctl` uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentPair {
    /// SDK name for physical devices (`iphoneos`).
    pub device: &'static str,
    /// SDK name for the simulator (`iphonesimulator`).
    pub simulator: &'static str,
    /// Human readable platform label (`iOS`), also the simulator runtime prefix.
    pub label: &'static str,
}

/// How a platform is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pairing {
    /// Device and simulator builds merged into an xcframework.
    Paired(EnvironmentPair),
    /// A single build against the native SDK.
    Native {
        /// SDK name (`macosx`).
        environment: &'static str,
    },
}

impl Pairing {
    /// All environments this pairing builds, device first.
    pub fn environments(&self) -> Vec<&'static str> {
        match self {
            Pairing::Paired(pair) => vec![pair.device, pair.simulator],
            Pairing::Native { environment } => vec![*environment],
        }
    }
}

const IOS: EnvironmentPair = EnvironmentPair {
    device: "iphoneos",
    simulator: "iphonesimulator",
    label: "iOS",
};

const TVOS: EnvironmentPair = EnvironmentPair {
    device: "appletvos",
    simulator: "appletvsimulator",
    label: "tvOS",
};

const WATCHOS: EnvironmentPair = EnvironmentPair {
    device: "watchos",
    simulator: "watchsimulator",
    label: "watchOS",
};

impl Platform {
    /// All supported platform families.
    pub const ALL: [Platform; 4] = [
        Platform::Ios,
        Platform::Macos,
        Platform::Tvos,
        Platform::Watchos,
    ];

    /// Parses a platform tag as CocoaPods writes it (`ios`, `osx`, `tvos`, `watchos`).
    pub fn from_tag(tag: &str) -> Result<Self, RomeError> {
        match tag.to_ascii_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "osx" | "macos" => Ok(Platform::Macos),
            "tvos" => Ok(Platform::Tvos),
            "watchos" => Ok(Platform::Watchos),
            _ => Err(RomeError::UnknownPlatform(tag.to_string())),
        }
    }

    /// Returns the canonical tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Macos => "osx",
            Platform::Tvos => "tvos",
            Platform::Watchos => "watchos",
        }
    }

    /// Looks up the environments for this platform.
    pub fn pairing(&self) -> Pairing {
        match self {
            Platform::Ios => Pairing::Paired(IOS),
            Platform::Tvos => Pairing::Paired(TVOS),
            Platform::Watchos => Pairing::Paired(WATCHOS),
            Platform::Macos => Pairing::Native {
                environment: "macosx",
            },
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves a raw platform tag straight to its pairing.
pub fn resolve(tag: &str) -> Result<(Platform, Pairing), RomeError> {
    let platform = Platform::from_tag(tag)?;
    Ok((platform, platform.pairing()))
}

/// Returns the simulator label for an SDK name, if it is a simulator SDK.
///
/// Only simulator builds need a `-destination`.
pub fn simulator_label(environment: &str) -> Option<&'static str> {
    [IOS, TVOS, WATCHOS]
        .into_iter()
        .find(|pair| pair.simulator == environment)
        .map(|pair| pair.label)
}

/// Whether an SDK name is one of the simulator SDKs.
pub fn is_simulator(environment: &str) -> bool {
    simulator_label(environment).is_some()
}
