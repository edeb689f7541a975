//! Fakes for the external seams, shared by the unit tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::builders::{BuildInvocation, BuildTool, BundleMerger};
use crate::collect::FileAccessor;
use crate::layout::BuildLayout;
use crate::platform::Platform;
use crate::project::ProjectModel;
use crate::types::{ModuleFiles, ModuleSpec, RomeError, Target};

/// An iOS target with one spec per name.
pub fn ios_target(label: &str, names: &[&str]) -> Target {
    Target {
        label: label.to_string(),
        platform: "ios".to_string(),
        deployment_target: Some("15.0".to_string()),
        specs: names.iter().map(|name| ModuleSpec::named(*name)).collect(),
    }
}

/// Writes the product tree `xcodebuild` would leave behind.
pub struct FakeBuildTool {
    layout: BuildLayout,
    products: Vec<(String, String)>,
    skipped: Vec<String>,
    failing: Option<String>,
    silent: bool,
    invocations: RefCell<Vec<BuildInvocation>>,
}

impl FakeBuildTool {
    pub fn new(layout: BuildLayout) -> Self {
        Self {
            layout,
            products: Vec::new(),
            skipped: Vec::new(),
            failing: None,
            silent: false,
            invocations: RefCell::new(Vec::new()),
        }
    }

    /// Every build produces `{root}/{module}.framework` plus its dSYM.
    pub fn produces(mut self, root: &str, module: &str) -> Self {
        self.products.push((root.to_string(), module.to_string()));
        self
    }

    /// Builds for `environment` succeed but write no products.
    pub fn skip_environment(mut self, environment: &str) -> Self {
        self.skipped.push(environment.to_string());
        self
    }

    /// Builds for `environment` exit non-zero.
    pub fn fail_on(mut self, environment: &str) -> Self {
        self.failing = Some(environment.to_string());
        self
    }

    /// Builds succeed without writing anything, not even the scratch directory.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn invocations(&self) -> Vec<BuildInvocation> {
        self.invocations.borrow().clone()
    }
}

impl BuildTool for FakeBuildTool {
    fn build(&self, invocation: &BuildInvocation) -> Result<(), RomeError> {
        self.invocations.borrow_mut().push(invocation.clone());

        if self.failing.as_deref() == Some(invocation.sdk.as_str()) {
            return Err(RomeError::BuildFailed {
                scheme: invocation.scheme.clone(),
                sdk: invocation.sdk.clone(),
                configuration: invocation.configuration.to_string(),
                status: "exit status: 65".to_string(),
                output: "** BUILD FAILED **".to_string(),
            });
        }
        if self.silent {
            return Ok(());
        }

        let products = self
            .layout
            .products_dir(invocation.configuration, &invocation.sdk);
        fs::create_dir_all(&products)?;
        if self.skipped.contains(&invocation.sdk) {
            return Ok(());
        }

        for (root, module) in &self.products {
            let framework =
                self.layout
                    .product_path(invocation.configuration, &invocation.sdk, root, module);
            fs::create_dir_all(&framework)?;
            fs::write(framework.join(module), invocation.sdk.as_bytes())?;

            let dsym = products
                .join(root)
                .join(format!("{}.framework.dSYM", module));
            fs::create_dir_all(dsym.join("Contents/Resources/DWARF"))?;
            fs::write(dsym.join("Contents/Resources/DWARF").join(module), b"dwarf")?;
        }
        Ok(())
    }
}

/// Creates the output directory unless told to fail.
///
/// The bundle's `Info.plist` lists the product directory of every input, one
/// per line, so tests can tell which pass produced it.
#[derive(Default)]
pub struct FakeMerger {
    failure: Option<String>,
    calls: RefCell<Vec<(Vec<PathBuf>, PathBuf)>>,
}

impl FakeMerger {
    /// Writes nothing and reports `log`.
    pub fn failing(log: &str) -> Self {
        Self {
            failure: Some(log.to_string()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(Vec<PathBuf>, PathBuf)> {
        self.calls.borrow().clone()
    }
}

impl BundleMerger for FakeMerger {
    fn create_xcframework(
        &self,
        frameworks: &[PathBuf],
        output: &Path,
    ) -> Result<String, RomeError> {
        self.calls
            .borrow_mut()
            .push((frameworks.to_vec(), output.to_path_buf()));

        if let Some(log) = &self.failure {
            return Ok(log.clone());
        }
        if output.exists() {
            return Ok(format!(
                "error: the path does not point to a valid xcframework: {}",
                output.display()
            ));
        }
        let sources: Vec<String> = frameworks
            .iter()
            .filter_map(|framework| framework.parent()?.parent()?.file_name())
            .map(|dir| dir.to_string_lossy().into_owned())
            .collect();
        fs::create_dir_all(output)?;
        fs::write(output.join("Info.plist"), sources.join("\n"))?;
        Ok(format!("xcframework successfully written out to: {}", output.display()))
    }
}

/// Serves fixed [`ModuleFiles`] per root spec name.
#[derive(Default)]
pub struct FakeFileAccessor {
    files: HashMap<String, ModuleFiles>,
    lookups: RefCell<Vec<(String, Platform)>>,
}

impl FakeFileAccessor {
    pub fn with(mut self, root: &str, files: ModuleFiles) -> Self {
        self.files.insert(root.to_string(), files);
        self
    }

    pub fn lookups(&self) -> Vec<(String, Platform)> {
        self.lookups.borrow().clone()
    }
}

impl FileAccessor for FakeFileAccessor {
    fn files(&self, spec: &ModuleSpec, platform: Platform) -> Result<ModuleFiles, RomeError> {
        self.lookups
            .borrow_mut()
            .push((spec.root_name.clone(), platform));
        Ok(self.files.get(&spec.root_name).cloned().unwrap_or_default())
    }
}

/// Project model kept in memory.
#[derive(Debug)]
pub struct MemoryProject {
    configurations: Vec<String>,
    settings: HashMap<(String, String), String>,
    pub saves: usize,
    /// Settings as of each save, in order.
    pub snapshots: Vec<HashMap<(String, String), String>>,
    fail_saves: bool,
}

impl MemoryProject {
    pub fn with_configurations(names: &[&str]) -> Self {
        Self {
            configurations: names.iter().map(|name| name.to_string()).collect(),
            settings: HashMap::new(),
            saves: 0,
            snapshots: Vec::new(),
            fail_saves: false,
        }
    }

    /// Every subsequent save returns an error.
    pub fn failing_saves(mut self) -> Self {
        self.fail_saves = true;
        self
    }
}

impl ProjectModel for MemoryProject {
    fn open(_path: &Path) -> Result<Self, RomeError> {
        Ok(Self::with_configurations(&["Debug", "Release"]))
    }

    fn configurations(&self) -> Vec<String> {
        self.configurations.clone()
    }

    fn build_setting(&self, configuration: &str, key: &str) -> Option<String> {
        self.settings
            .get(&(configuration.to_string(), key.to_string()))
            .cloned()
    }

    fn set_build_setting(
        &mut self,
        configuration: &str,
        key: &str,
        value: &str,
    ) -> Result<(), RomeError> {
        self.settings.insert(
            (configuration.to_string(), key.to_string()),
            value.to_string(),
        );
        Ok(())
    }

    fn save(&mut self) -> Result<(), RomeError> {
        if self.fail_saves {
            return Err(RomeError::Project("project file is read-only".to_string()));
        }
        self.saves += 1;
        self.snapshots.push(self.settings.clone());
        Ok(())
    }
}
