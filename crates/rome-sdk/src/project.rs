//! Project model used to toggle build settings before a pass.
//!
//! The pipeline only needs a read-modify-save contract, captured by
//! [`ProjectModel`]. [`XcconfigProject`] implements it on top of an
//! `.xcconfig` file handed to `xcodebuild -xcconfig`, using conditional
//! entries (`KEY[config=Debug] = VALUE`) so each configuration keeps its own
//! values.

use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{Configuration, RomeError};

/// Settings written when dSYM staging is enabled.
pub const DEBUG_INFORMATION_SETTINGS: [(&str, &str); 2] = [
    ("DEBUG_INFORMATION_FORMAT", "dwarf-with-dsym"),
    ("ONLY_ACTIVE_ARCH", "NO"),
];

/// Settings written before every pass so products are installable and
/// module-stable.
pub const DISTRIBUTION_SETTINGS: [(&str, &str); 2] = [
    ("SKIP_INSTALL", "NO"),
    ("BUILD_LIBRARIES_FOR_DISTRIBUTION", "YES"),
];

/// Read-modify-save access to a project's build settings.
pub trait ProjectModel {
    /// Opens the project at `path`.
    fn open(path: &Path) -> Result<Self, RomeError>
    where
        Self: Sized;

    /// Names of the build configurations the project defines.
    fn configurations(&self) -> Vec<String>;

    /// Current value of `key` for `configuration`.
    fn build_setting(&self, configuration: &str, key: &str) -> Option<String>;

    /// Sets `key` for `configuration`. Not persisted until [`save`](Self::save).
    fn set_build_setting(
        &mut self,
        configuration: &str,
        key: &str,
        value: &str,
    ) -> Result<(), RomeError>;

    /// Persists pending changes.
    fn save(&mut self) -> Result<(), RomeError>;
}

/// Writes `settings` for `configuration` and saves.
pub fn apply_settings(
    project: &mut dyn ProjectModel,
    configuration: Configuration,
    settings: &[(&str, &str)],
) -> Result<(), RomeError> {
    let name = configuration.as_str();
    if !project.configurations().iter().any(|c| c == name) {
        return Err(RomeError::Project(format!(
            "build configuration '{}' not found (available: {})",
            name,
            project.configurations().join(", ")
        )));
    }

    for (key, value) in settings {
        project.set_build_setting(name, key, value)?;
    }
    project.save()
}

/// Requests dSYM generation for every architecture.
pub fn enable_debug_information(
    project: &mut dyn ProjectModel,
    configuration: Configuration,
) -> Result<(), RomeError> {
    tracing::debug!(%configuration, "enabling dwarf-with-dsym");
    apply_settings(project, configuration, &DEBUG_INFORMATION_SETTINGS)
}

/// Enables installation and library evolution.
pub fn configure_build_options(
    project: &mut dyn ProjectModel,
    configuration: Configuration,
) -> Result<(), RomeError> {
    tracing::debug!(%configuration, "enabling BUILD_LIBRARIES_FOR_DISTRIBUTION");
    apply_settings(project, configuration, &DISTRIBUTION_SETTINGS)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Setting {
        key: String,
        configuration: Option<String>,
        value: String,
    },
    /// Comments, includes and anything we do not manage, kept verbatim.
    Verbatim(String),
}

/// An `.xcconfig` file used as the project model.
///
/// A missing file opens as empty and is created on [`save`](ProjectModel::save).
#[derive(Debug, Clone)]
pub struct XcconfigProject {
    path: PathBuf,
    lines: Vec<Line>,
}

impl XcconfigProject {
    /// Parses xcconfig text.
    pub fn parse(path: impl Into<PathBuf>, contents: &str) -> Self {
        Self {
            path: path.into(),
            lines: contents.lines().map(parse_line).collect(),
        }
    }

    /// File this project saves to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renders the file contents.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Setting {
                    key,
                    configuration: Some(configuration),
                    value,
                } => out.push_str(&format!("{}[config={}] = {}", key, configuration, value)),
                Line::Setting {
                    key,
                    configuration: None,
                    value,
                } => out.push_str(&format!("{} = {}", key, value)),
                Line::Verbatim(raw) => out.push_str(raw),
            }
            out.push('\n');
        }
        out
    }
}

fn parse_line(raw: &str) -> Line {
    let verbatim = || Line::Verbatim(raw.to_string());
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with("//") || trimmed.starts_with('#') {
        return verbatim();
    }

    let Some(eq) = trimmed.find('=') else {
        return verbatim();
    };
    // The first `=` may sit inside a `[cond=value]` qualifier.
    let lhs_end = match trimmed.find('[') {
        Some(open) if open < eq => match trimmed[open..].find(']') {
            Some(close) => open + close + 1,
            None => return verbatim(),
        },
        _ => eq,
    };
    let Some(rhs) = trimmed[lhs_end..].trim_start().strip_prefix('=') else {
        return verbatim();
    };
    let lhs = trimmed[..lhs_end].trim();
    let value = rhs.trim().trim_end_matches(';').trim().to_string();

    let (key, configuration) = match lhs.split_once('[') {
        None => (lhs, None),
        Some((key, condition)) => {
            // Only a single [config=NAME] condition is managed.
            let Some(name) = condition
                .strip_suffix(']')
                .and_then(|c| c.strip_prefix("config="))
            else {
                return verbatim();
            };
            if name.contains(['[', ']', ',']) {
                return verbatim();
            }
            (key, Some(name.to_string()))
        }
    };

    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return verbatim();
    }

    Line::Setting {
        key: key.to_string(),
        configuration,
        value,
    }
}

impl ProjectModel for XcconfigProject {
    fn open(path: &Path) -> Result<Self, RomeError> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(Self::parse(path, &contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = ?path, "xcconfig does not exist yet");
                Ok(Self {
                    path: path.to_path_buf(),
                    lines: vec![Line::Verbatim(
                        "// Build settings managed by rome.".to_string(),
                    )],
                })
            }
            Err(e) => Err(RomeError::fs("read", path, e)),
        }
    }

    fn configurations(&self) -> Vec<String> {
        let mut names = vec![
            Configuration::Debug.as_str().to_string(),
            Configuration::Release.as_str().to_string(),
        ];
        for line in &self.lines {
            if let Line::Setting {
                configuration: Some(name),
                ..
            } = line
                && !names.contains(name)
            {
                names.push(name.clone());
            }
        }
        names
    }

    fn build_setting(&self, configuration: &str, key: &str) -> Option<String> {
        let mut conditional = None;
        let mut unconditional = None;
        for line in &self.lines {
            if let Line::Setting {
                key: k,
                configuration: c,
                value,
            } = line
                && k == key
            {
                match c {
                    Some(c) if c == configuration => conditional = Some(value.clone()),
                    None => unconditional = Some(value.clone()),
                    Some(_) => {}
                }
            }
        }
        conditional.or(unconditional)
    }

    fn set_build_setting(
        &mut self,
        configuration: &str,
        key: &str,
        value: &str,
    ) -> Result<(), RomeError> {
        let existing = self.lines.iter_mut().find_map(|line| match line {
            Line::Setting {
                key: k,
                configuration: Some(c),
                value,
            } if k == key && c == configuration => Some(value),
            _ => None,
        });

        match existing {
            Some(existing) => *existing = value.to_string(),
            None => self.lines.push(Line::Setting {
                key: key.to_string(),
                configuration: Some(configuration.to_string()),
                value: value.to_string(),
            }),
        }
        Ok(())
    }

    fn save(&mut self) -> Result<(), RomeError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| RomeError::fs("create directory", parent, e))?;
        }
        fs::write(&self.path, self.render()).map_err(|e| RomeError::fs("write", &self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemoryProject;
    use tempfile::TempDir;

    #[test]
    fn test_parse_and_render_preserves_unmanaged_lines() {
        let text = "// header\n#include \"Pods.xcconfig\"\nOTHER_LDFLAGS = -ObjC\nSWIFT_VERSION[sdk=iphoneos*] = 5.0\nSKIP_INSTALL[config=Debug] = YES\n";
        let project = XcconfigProject::parse("Rome.xcconfig", text);
        assert_eq!(project.render(), text);
    }

    #[test]
    fn test_conditional_overrides_unconditional() {
        let project = XcconfigProject::parse(
            "Rome.xcconfig",
            "ONLY_ACTIVE_ARCH = YES\nONLY_ACTIVE_ARCH[config=Release] = NO\n",
        );
        assert_eq!(
            project.build_setting("Release", "ONLY_ACTIVE_ARCH").as_deref(),
            Some("NO")
        );
        assert_eq!(
            project.build_setting("Debug", "ONLY_ACTIVE_ARCH").as_deref(),
            Some("YES")
        );
        assert_eq!(project.build_setting("Debug", "MISSING"), None);
    }

    #[test]
    fn test_set_replaces_existing_entry() {
        let mut project =
            XcconfigProject::parse("Rome.xcconfig", "SKIP_INSTALL[config=Debug] = YES\n");
        project
            .set_build_setting("Debug", "SKIP_INSTALL", "NO")
            .unwrap();
        project
            .set_build_setting("Release", "SKIP_INSTALL", "NO")
            .unwrap();

        assert_eq!(
            project.render(),
            "SKIP_INSTALL[config=Debug] = NO\nSKIP_INSTALL[config=Release] = NO\n"
        );
    }

    #[test]
    fn test_conditional_entry_is_read_back_and_updated_in_place() {
        let mut project =
            XcconfigProject::parse("Rome.xcconfig", "SKIP_INSTALL[config=Debug] = YES\n");
        assert_eq!(
            project.build_setting("Debug", "SKIP_INSTALL").as_deref(),
            Some("YES")
        );

        project.set_build_setting("Debug", "SKIP_INSTALL", "NO").unwrap();
        let mut reparsed = XcconfigProject::parse("Rome.xcconfig", &project.render());
        reparsed.set_build_setting("Debug", "SKIP_INSTALL", "NO").unwrap();

        assert_eq!(reparsed.render(), "SKIP_INSTALL[config=Debug] = NO\n");
        assert_eq!(reparsed.configurations(), vec!["Debug", "Release"]);
    }

    #[test]
    fn test_qualified_lines_outside_management_stay_verbatim() {
        let text = "SWIFT_VERSION[sdk=iphoneos*] = 5.0\nFLAGS[config=Debug][sdk=*] = -g\nBROKEN[config=Debug\n";
        let project = XcconfigProject::parse("Rome.xcconfig", text);
        assert_eq!(project.build_setting("Debug", "SWIFT_VERSION"), None);
        assert_eq!(project.build_setting("Debug", "FLAGS"), None);
        assert_eq!(project.render(), text);
    }

    #[test]
    fn test_saving_twice_does_not_grow_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Rome.xcconfig");

        for _ in 0..2 {
            let mut project = XcconfigProject::open(&path).unwrap();
            configure_build_options(&mut project, Configuration::Debug).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches("SKIP_INSTALL[config=Debug]").count(), 1);
        assert_eq!(
            contents
                .matches("BUILD_LIBRARIES_FOR_DISTRIBUTION[config=Debug]")
                .count(),
            1
        );
    }

    #[test]
    fn test_open_missing_then_save_creates_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Pods/Rome.xcconfig");

        let mut project = XcconfigProject::open(&path).unwrap();
        configure_build_options(&mut project, Configuration::Release).unwrap();
        enable_debug_information(&mut project, Configuration::Release).unwrap();

        let reopened = XcconfigProject::open(&path).unwrap();
        assert_eq!(
            reopened
                .build_setting("Release", "BUILD_LIBRARIES_FOR_DISTRIBUTION")
                .as_deref(),
            Some("YES")
        );
        assert_eq!(
            reopened
                .build_setting("Release", "DEBUG_INFORMATION_FORMAT")
                .as_deref(),
            Some("dwarf-with-dsym")
        );
        assert_eq!(reopened.build_setting("Debug", "SKIP_INSTALL"), None);
    }

    #[test]
    fn test_apply_settings_requires_configuration() {
        let mut project = MemoryProject::with_configurations(&["Debug"]);
        let err = configure_build_options(&mut project, Configuration::Release).unwrap_err();
        assert!(err.to_string().contains("'Release' not found"));
        assert_eq!(project.saves, 0);

        configure_build_options(&mut project, Configuration::Debug).unwrap();
        assert_eq!(project.saves, 1);
        assert_eq!(
            project.build_setting("Debug", "SKIP_INSTALL").as_deref(),
            Some("NO")
        );
    }
}
