//! Simulator destination lookup.
//!
//! Simulator builds are pinned to the oldest installed runtime that still
//! satisfies the target's deployment version, so the produced slice runs on
//! every supported OS.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::process::Command;

use super::common::run_command;
use crate::types::RomeError;

/// A dotted OS version (`15.0`, `17.2.1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OsVersion(pub u32, pub u32, pub u32);

impl OsVersion {
    /// Parses `15`, `15.0` or `15.0.1`; runtime identifiers use `-` (`17-2`).
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().split(['.', '-']).map(|p| p.parse::<u32>());
        let major = parts.next()?.ok()?;
        let minor = match parts.next() {
            Some(part) => part.ok()?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(part) => part.ok()?,
            None => 0,
        };
        Some(OsVersion(major, minor, patch))
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

/// An installed simulator device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Simulator {
    /// Device UDID, used as `-destination id=<udid>`.
    pub udid: String,
    /// Device name (`iPhone 15`).
    pub name: String,
    /// Runtime platform (`iOS`, `tvOS`, `watchOS`).
    pub os_name: String,
    /// Runtime version.
    pub os_version: OsVersion,
}

/// Value passed to `xcodebuild -destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A concrete simulator.
    Simulator {
        /// Device UDID.
        udid: String,
    },
    /// Any simulator of the platform.
    Generic {
        /// Platform label (`iOS`).
        label: String,
    },
}

impl Destination {
    /// Formats the destination specifier.
    pub fn as_arg(&self) -> String {
        match self {
            Destination::Simulator { udid } => format!("id={}", udid),
            Destination::Generic { label } => format!("generic/platform={} Simulator", label),
        }
    }
}

#[derive(Deserialize)]
struct DeviceList {
    devices: BTreeMap<String, Vec<DeviceEntry>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceEntry {
    udid: String,
    name: String,
    #[serde(default = "default_available")]
    is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Parses `xcrun simctl list devices -j` output.
///
/// Runtime keys look like `com.apple.CoreSimulator.SimRuntime.iOS-17-2`;
/// unrecognised keys and unavailable devices are skipped.
pub fn parse_simulators(json: &str) -> Result<Vec<Simulator>, RomeError> {
    let list: DeviceList = serde_json::from_str(json)?;
    let mut simulators = Vec::new();

    for (runtime, devices) in list.devices {
        let Some((os_name, os_version)) = parse_runtime(&runtime) else {
            continue;
        };
        for device in devices.into_iter().filter(|d| d.is_available) {
            simulators.push(Simulator {
                udid: device.udid,
                name: device.name,
                os_name: os_name.clone(),
                os_version,
            });
        }
    }

    Ok(simulators)
}

fn parse_runtime(runtime: &str) -> Option<(String, OsVersion)> {
    let suffix = runtime.rsplit('.').next()?;
    let (os_name, version) = suffix.split_once('-')?;
    Some((os_name.to_string(), OsVersion::parse(version)?))
}

/// Picks the oldest simulator of `os_name` whose runtime is at least `minimum`.
pub fn oldest_simulator<'a>(
    simulators: &'a [Simulator],
    os_name: &str,
    minimum: Option<OsVersion>,
) -> Option<&'a Simulator> {
    simulators
        .iter()
        .filter(|sim| sim.os_name == os_name)
        .filter(|sim| minimum.is_none_or(|min| sim.os_version >= min))
        .min_by_key(|sim| sim.os_version)
}

/// Lists available simulators with `xcrun simctl`.
pub fn list_simulators() -> Result<Vec<Simulator>, RomeError> {
    let mut cmd = Command::new("xcrun");
    cmd.args(["simctl", "list", "devices", "available", "-j"]);
    let output = run_command(cmd, "xcrun simctl")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RomeError::Config(format!(
            "xcrun simctl list failed ({}): {}",
            output.status,
            stderr.trim()
        )));
    }

    parse_simulators(&String::from_utf8_lossy(&output.stdout))
}

/// Resolves the destination for a simulator build.
///
/// Falls back to a generic simulator destination when no matching runtime is
/// installed or `simctl` is unusable; `xcodebuild` then picks one itself.
pub fn oldest_destination(label: &str, deployment_target: Option<&str>) -> Destination {
    let minimum = deployment_target.and_then(OsVersion::parse);
    let generic = Destination::Generic {
        label: label.to_string(),
    };

    let simulators = match list_simulators() {
        Ok(simulators) => simulators,
        Err(e) => {
            tracing::warn!(error = %e, "could not list simulators, using generic destination");
            return generic;
        }
    };

    match oldest_simulator(&simulators, label, minimum) {
        Some(sim) => {
            tracing::debug!(
                name = %sim.name,
                version = %sim.os_version,
                udid = %sim.udid,
                "selected simulator"
            );
            Destination::Simulator {
                udid: sim.udid.clone(),
            }
        }
        None => {
            tracing::warn!(
                platform = label,
                minimum = ?deployment_target,
                "no simulator runtime satisfies the deployment target, using generic destination"
            );
            generic
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMCTL_JSON: &str = r#"{
      "devices": {
        "com.apple.CoreSimulator.SimRuntime.iOS-17-2": [
          { "udid": "AAA-172", "name": "iPhone 15", "isAvailable": true, "state": "Shutdown" }
        ],
        "com.apple.CoreSimulator.SimRuntime.iOS-15-5": [
          { "udid": "BBB-155", "name": "iPhone 8", "isAvailable": true, "state": "Shutdown" },
          { "udid": "CCC-155", "name": "iPhone 13", "isAvailable": false, "state": "Shutdown" }
        ],
        "com.apple.CoreSimulator.SimRuntime.iOS-14-0": [
          { "udid": "DDD-140", "name": "iPhone 11", "isAvailable": true }
        ],
        "com.apple.CoreSimulator.SimRuntime.tvOS-17-0": [
          { "udid": "EEE-TV", "name": "Apple TV", "isAvailable": true }
        ]
      }
    }"#;

    #[test]
    fn test_os_version_parse() {
        assert_eq!(OsVersion::parse("15"), Some(OsVersion(15, 0, 0)));
        assert_eq!(OsVersion::parse("15.0"), Some(OsVersion(15, 0, 0)));
        assert_eq!(OsVersion::parse("17-2"), Some(OsVersion(17, 2, 0)));
        assert_eq!(OsVersion::parse("12.4.1"), Some(OsVersion(12, 4, 1)));
        assert_eq!(OsVersion::parse("beta"), None);
        assert!(OsVersion(15, 5, 0) > OsVersion(15, 0, 0));
    }

    #[test]
    fn test_parse_skips_unavailable_devices() {
        let sims = parse_simulators(SIMCTL_JSON).unwrap();
        assert_eq!(sims.len(), 4);
        assert!(sims.iter().all(|s| s.udid != "CCC-155"));
        let tv = sims.iter().find(|s| s.os_name == "tvOS").unwrap();
        assert_eq!(tv.os_version, OsVersion(17, 0, 0));
    }

    #[test]
    fn test_oldest_respects_deployment_target() {
        let sims = parse_simulators(SIMCTL_JSON).unwrap();

        let oldest = oldest_simulator(&sims, "iOS", OsVersion::parse("15.0")).unwrap();
        assert_eq!(oldest.udid, "BBB-155");

        let any = oldest_simulator(&sims, "iOS", None).unwrap();
        assert_eq!(any.udid, "DDD-140");

        assert!(oldest_simulator(&sims, "iOS", OsVersion::parse("18.0")).is_none());
        assert!(oldest_simulator(&sims, "watchOS", None).is_none());
    }

    #[test]
    fn test_destination_args() {
        let sim = Destination::Simulator {
            udid: "BBB-155".to_string(),
        };
        assert_eq!(sim.as_arg(), "id=BBB-155");

        let generic = Destination::Generic {
            label: "tvOS".to_string(),
        };
        assert_eq!(generic.as_arg(), "generic/platform=tvOS Simulator");
    }
}
