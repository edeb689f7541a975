//! Hook options supplied by the user.
//!
//! Options arrive as an untyped map (the `[options]` table of a manifest or
//! whatever the installer forwards). [`HookOptions::from_user_options`] reads
//! the plain values; the callable hooks are attached with
//! [`HookOptions::pre_compile`] and [`HookOptions::post_compile`].

use std::fmt;

use serde_json::{Map, Value};

use crate::types::{ConfigurationSelection, InstallerContext, RomeError};

/// A user callback run before or after compilation.
pub type Hook = Box<dyn Fn(&InstallerContext) -> Result<(), RomeError>>;

const KNOWN_KEYS: [&str; 4] = ["dsym", "configuration", "pre_compile", "post_compile"];

/// Options controlling one run.
pub struct HookOptions {
    /// Stage dSYM bundles and force `dwarf-with-dsym`. Defaults to `true`.
    pub dsym: bool,
    /// Configurations to build. Defaults to Debug.
    pub configuration: ConfigurationSelection,
    /// Runs before anything else.
    pub pre_compile: Option<Hook>,
    /// Runs after every pass finished.
    pub post_compile: Option<Hook>,
}

impl Default for HookOptions {
    fn default() -> Self {
        Self {
            dsym: true,
            configuration: ConfigurationSelection::default(),
            pre_compile: None,
            post_compile: None,
        }
    }
}

impl fmt::Debug for HookOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookOptions")
            .field("dsym", &self.dsym)
            .field("configuration", &self.configuration)
            .field("pre_compile", &self.pre_compile.is_some())
            .field("post_compile", &self.post_compile.is_some())
            .finish()
    }
}

impl HookOptions {
    /// Reads `dsym` and `configuration` from a user options map.
    ///
    /// Unknown keys are logged and ignored. `pre_compile` / `post_compile`
    /// entries are accepted but not interpreted here.
    pub fn from_user_options(options: &Map<String, Value>) -> Result<Self, RomeError> {
        let mut parsed = Self::default();

        for key in options.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                tracing::warn!(key = %key, "ignoring unknown option");
            }
        }

        match options.get("dsym") {
            None | Some(Value::Null) => {}
            Some(Value::Bool(dsym)) => parsed.dsym = *dsym,
            Some(other) => {
                return Err(RomeError::Config(format!(
                    "option 'dsym' must be true or false, got {}",
                    other
                )));
            }
        }

        match options.get("configuration") {
            None | Some(Value::Null) => {}
            Some(Value::String(name)) => parsed.configuration = name.parse()?,
            Some(other) => {
                return Err(RomeError::Config(format!(
                    "option 'configuration' must be a string, got {}",
                    other
                )));
            }
        }

        Ok(parsed)
    }

    /// Sets the pre-compile hook.
    pub fn pre_compile(
        mut self,
        hook: impl Fn(&InstallerContext) -> Result<(), RomeError> + 'static,
    ) -> Self {
        self.pre_compile = Some(Box::new(hook));
        self
    }

    /// Sets the post-compile hook.
    pub fn post_compile(
        mut self,
        hook: impl Fn(&InstallerContext) -> Result<(), RomeError> + 'static,
    ) -> Self {
        self.post_compile = Some(Box::new(hook));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Configuration;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_defaults() {
        let options = HookOptions::from_user_options(&Map::new()).unwrap();
        assert!(options.dsym);
        assert_eq!(
            options.configuration,
            ConfigurationSelection::Single(Configuration::Debug)
        );
        assert!(options.pre_compile.is_none());
    }

    #[test]
    fn test_reads_values() {
        let options = HookOptions::from_user_options(&map(json!({
            "dsym": false,
            "configuration": "both",
            "pre_compile": "echo hi",
            "frobnicate": 1,
        })))
        .unwrap();
        assert!(!options.dsym);
        assert_eq!(options.configuration, ConfigurationSelection::Both);
    }

    #[test]
    fn test_rejects_bad_types() {
        let err = HookOptions::from_user_options(&map(json!({ "dsym": "yes" }))).unwrap_err();
        assert!(err.to_string().contains("'dsym'"));

        let err = HookOptions::from_user_options(&map(json!({ "configuration": "Profile" })))
            .unwrap_err();
        assert!(err.to_string().contains("Profile"));
    }

    #[test]
    fn test_debug_hides_callables() {
        let options = HookOptions::default().pre_compile(|_| Ok(()));
        let rendered = format!("{:?}", options);
        assert!(rendered.contains("pre_compile: true"));
        assert!(rendered.contains("post_compile: false"));
    }
}
