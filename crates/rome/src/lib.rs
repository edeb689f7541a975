//! # rome
//!
//! Command-line tool that prebuilds CocoaPods targets into xcframeworks.
//!
//! ## Overview
//!
//! `rome` reads a manifest describing the pod targets of an installation and
//! runs the [`rome_sdk`] pipeline on it:
//!
//! - **Building** - `xcodebuild` for the device and simulator SDK of each target
//! - **Merging** - one `.xcframework` per module
//! - **Staging** - artifacts to `Rome/{Configuration}`, dSYMs to `dSYM/{environment}`
//!
//! ## Quick Start
//!
//! ```bash
//! # Write a starter manifest
//! rome init --label Pods-App --platform ios
//!
//! # Show what would run
//! rome plan --configuration both
//!
//! # Build, merge and stage
//! rome build --report target/rome-report.json
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `init` | Write a starter `rome.toml` |
//! | `plan` | Print environment pairs and xcodebuild invocations |
//! | `build` | Run the pipeline |
//!
//! ## Output Directory
//!
//! Everything is written next to the `Pods` sandbox:
//!
//! ```text
//! <root>/
//! ├── Rome/Debug/        # merged xcframeworks, vendored binaries, resources
//! ├── Rome/Release/
//! └── dSYM/iphoneos/     # debug symbols per environment
//! ```
//!
//! ## CLI Flags
//!
//! Global flags available on all commands:
//!
//! - **`--verbose` / `-v`** - Debug logging, including every xcodebuild command
//!
//! `RUST_LOG` overrides the log filter. A `.env` file in the current directory
//! or a parent is loaded first.
//!
//! ## Modules
//!
//! - [`config`] - Manifest support for `rome.toml`
//! - [`files`] - Vendored file lookup from the manifest

#![cfg_attr(docsrs, feature(doc_cfg))]

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use rome_sdk::builders::{TargetDriver, Xcodebuild, plan};
use rome_sdk::{
    BuildLayout, Configuration, ConfigurationSelection, HookOptions, InstallerContext, Pairing,
    ProjectModel, Rome, RomeError, RunReport, XcconfigProject,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command as Process;
use std::time::Instant;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::EnvFilter;

use config::{ConfigResolver, RomeManifest};
use files::ManifestFiles;

pub mod config;
pub mod files;

/// Prebuilds CocoaPods targets into device+simulator xcframeworks.
#[derive(Parser, Debug)]
#[command(name = "rome", author, version, about = "Prebuild CocoaPods targets into xcframeworks", long_about = None)]
struct Cli {
    /// Print verbose output including all commands
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build every target, merge xcframeworks and stage the results.
    Build {
        #[arg(long, help = "Path to the manifest (default: discover rome.toml upward)")]
        manifest: Option<PathBuf>,
        #[arg(long, value_enum, help = "Override the manifest's configuration option")]
        configuration: Option<ConfigurationArg>,
        #[arg(long, help = "Skip dSYM generation and staging")]
        no_dsym: bool,
        #[arg(long, help = "Write a JSON run report to this path")]
        report: Option<PathBuf>,
    },
    /// Print the environment pairs and xcodebuild invocations without running them.
    Plan {
        #[arg(long, help = "Path to the manifest (default: discover rome.toml upward)")]
        manifest: Option<PathBuf>,
        #[arg(long, value_enum, help = "Override the manifest's configuration option")]
        configuration: Option<ConfigurationArg>,
    },
    /// Write a starter manifest.
    Init {
        #[arg(long, default_value = "rome.toml")]
        output: PathBuf,
        #[arg(long, default_value = "Pods-App", help = "Scheme of the first target")]
        label: String,
        #[arg(long, value_enum, default_value_t = PlatformArg::Ios)]
        platform: PlatformArg,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ConfigurationArg {
    Debug,
    Release,
    Both,
}

impl From<ConfigurationArg> for ConfigurationSelection {
    fn from(value: ConfigurationArg) -> Self {
        match value {
            ConfigurationArg::Debug => ConfigurationSelection::Single(Configuration::Debug),
            ConfigurationArg::Release => ConfigurationSelection::Single(Configuration::Release),
            ConfigurationArg::Both => ConfigurationSelection::Both,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum PlatformArg {
    Ios,
    Osx,
    Tvos,
    Watchos,
}

impl PlatformArg {
    fn as_str(&self) -> &'static str {
        match self {
            PlatformArg::Ios => "ios",
            PlatformArg::Osx => "osx",
            PlatformArg::Tvos => "tvos",
            PlatformArg::Watchos => "watchos",
        }
    }
}

/// Report written by `rome build --report`.
#[derive(Debug, Serialize)]
struct ReportFile<'a> {
    generated_at: String,
    manifest: &'a Path,
    #[serde(flatten)]
    report: &'a RunReport,
}

pub fn run() -> Result<()> {
    load_dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build {
            manifest,
            configuration,
            no_dsym,
            report,
        } => cmd_build(
            manifest.as_deref(),
            configuration,
            no_dsym,
            report.as_deref(),
        ),
        Command::Plan {
            manifest,
            configuration,
        } => cmd_plan(manifest.as_deref(), configuration),
        Command::Init {
            output,
            label,
            platform,
        } => cmd_init(&output, &label, platform),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed when embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .try_init();
}

fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Hook options from the manifest with CLI overrides and shell hooks attached.
fn hook_options(
    manifest: &RomeManifest,
    base_dir: &Path,
    configuration: Option<ConfigurationArg>,
    no_dsym: bool,
) -> Result<HookOptions> {
    let mut options = HookOptions::from_user_options(&manifest.options)
        .context("invalid [options] in manifest")?;

    if let Some(configuration) = configuration {
        options.configuration = configuration.into();
    }
    if no_dsym {
        options.dsym = false;
    }
    if let Some(command) = manifest.string_option("pre_compile")? {
        options = options.pre_compile(shell_hook("pre_compile", command, base_dir));
    }
    if let Some(command) = manifest.string_option("post_compile")? {
        options = options.post_compile(shell_hook("post_compile", command, base_dir));
    }
    Ok(options)
}

/// Runs `command` with `sh -c` from `dir`.
///
/// The sandbox and project paths are exported as `ROME_SANDBOX_ROOT` and
/// `ROME_PROJECT`.
fn shell_hook(
    stage: &'static str,
    command: &str,
    dir: &Path,
) -> impl Fn(&InstallerContext) -> Result<(), RomeError> + 'static {
    let command = command.to_string();
    let dir = dir.to_path_buf();
    move |context| {
        tracing::info!(stage, command = %command, "running hook");
        let status = Process::new("sh")
            .arg("-c")
            .arg(&command)
            .current_dir(&dir)
            .env("ROME_SANDBOX_ROOT", &context.sandbox_root)
            .env("ROME_PROJECT", &context.project_path)
            .status()
            .map_err(|e| RomeError::Hook {
                stage,
                message: format!("failed to start `sh -c {}`: {}", command, e),
            })?;
        if !status.success() {
            return Err(RomeError::Hook {
                stage,
                message: format!("`{}` exited with {}", command, status),
            });
        }
        Ok(())
    }
}

fn cmd_build(
    manifest: Option<&Path>,
    configuration: Option<ConfigurationArg>,
    no_dsym: bool,
    report_path: Option<&Path>,
) -> Result<()> {
    let resolver = ConfigResolver::new(manifest)?;
    let (manifest, manifest_path) = resolver.require()?;
    let base_dir = resolver.base_dir();
    let paths = manifest.resolve_paths(&base_dir);
    let options = hook_options(manifest, &base_dir, configuration, no_dsym)?;

    let context = manifest.installer_context(&paths);
    let files = ManifestFiles::new(manifest, &paths.sandbox_root);
    let xcodebuild = Xcodebuild::new().xcconfig(&paths.xcconfig);
    let mut project = XcconfigProject::open(&paths.xcconfig)
        .with_context(|| format!("opening build settings {:?}", paths.xcconfig))?;

    println!(
        "Building {} target(s) from {} ({:?}, dsym={})",
        context.targets.len(),
        manifest_path.display(),
        options.configuration,
        options.dsym
    );

    let started = Instant::now();
    let report = Rome::new(&xcodebuild, &xcodebuild)
        .options(options)
        .run(&context, &files, &mut project)
        .context("rome build failed")?;

    print!("{}", render_summary(&report));
    println!("Finished in {:.1}s", started.elapsed().as_secs_f64());

    if let Some(path) = report_path {
        write_report(path, manifest_path, &report)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}

fn render_summary(report: &RunReport) -> String {
    let mut out = String::new();
    for pass in &report.passes {
        out.push_str(&format!(
            "{} -> {}: {} artifact(s), {} resource(s), {} dSYM(s)\n",
            pass.configuration,
            pass.destination.display(),
            pass.artifacts.len(),
            pass.resources.len(),
            pass.dsyms.len()
        ));
        for artifact in pass.artifacts.iter().chain(&pass.resources) {
            if let Some(name) = artifact.file_name() {
                out.push_str(&format!("  {}\n", name.to_string_lossy()));
            }
        }
        for skipped in &pass.skipped {
            out.push_str(&format!(
                "  skipped {} ({}): {:?}\n",
                skipped.root_name, skipped.target, skipped.reason
            ));
        }
    }
    out
}

fn write_report(path: &Path, manifest: &Path, report: &RunReport) -> Result<()> {
    let generated_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("formatting report timestamp")?;
    let contents = serde_json::to_string_pretty(&ReportFile {
        generated_at,
        manifest,
        report,
    })?;
    ensure_parent_dir(path)?;
    fs::write(path, contents).with_context(|| format!("writing report {:?}", path))
}

fn cmd_plan(manifest: Option<&Path>, configuration: Option<ConfigurationArg>) -> Result<()> {
    let resolver = ConfigResolver::new(manifest)?;
    let (manifest, _) = resolver.require()?;
    let base_dir = resolver.base_dir();
    let paths = manifest.resolve_paths(&base_dir);
    let options = hook_options(manifest, &base_dir, configuration, false)?;

    let context = manifest.installer_context(&paths);
    print!("{}", render_plan(&context, &paths.xcconfig, &options)?);
    Ok(())
}

fn render_plan(context: &InstallerContext, xcconfig: &Path, options: &HookOptions) -> Result<String> {
    let planned = plan(&context.targets)?;
    let layout = BuildLayout::new(context.output_root());
    let xcodebuild = Xcodebuild::new()
        .xcconfig(xcconfig)
        .resolve_destinations(false);
    let driver = TargetDriver::new(&layout, &context.project_path, &xcodebuild, &xcodebuild);

    let mut out = String::new();
    for configuration in options.configuration.configurations() {
        out.push_str(&format!(
            "{} -> {}\n",
            configuration,
            layout.destination(configuration).display()
        ));
        for target in &planned {
            out.push_str(&format!(
                "  {} ({}: {})\n",
                target.target.label,
                target.platform.as_str(),
                target.pairing.environments().join(" + ")
            ));
            for environment in target.pairing.environments() {
                let invocation = driver.invocation(target.target, environment, configuration);
                let destination = xcodebuild.destination(&invocation);
                out.push_str(&format!(
                    "    xcodebuild {}\n",
                    xcodebuild
                        .build_args(&invocation, destination.as_ref())
                        .join(" ")
                ));
            }
            if matches!(target.pairing, Pairing::Paired(_)) {
                for spec in target.target.unique_modules() {
                    out.push_str(&format!(
                        "    merge {} -> {}\n",
                        spec.module_name,
                        layout.xcframework_path(&spec.root_name).display()
                    ));
                }
            }
        }
    }
    if options.dsym {
        out.push_str(&format!("dSYMs -> {}\n", layout.dsym_dir().display()));
    }
    Ok(out)
}

fn cmd_init(output: &Path, label: &str, platform: PlatformArg) -> Result<()> {
    if output.exists() {
        bail!(
            "{} already exists; refusing to overwrite it.\n\nRemove it or pass --output <PATH>.",
            output.display()
        );
    }
    ensure_parent_dir(output)?;
    fs::write(
        output,
        RomeManifest::generate_starter_toml(label, platform.as_str()),
    )
    .with_context(|| format!("writing manifest {:?}", output))?;
    println!("Wrote starter manifest to {}", output.display());
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("creating directory {:?}", parent))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rome_sdk::{ModuleSpec, PassReport, SkipReason, SkippedModule, Target};
    use tempfile::TempDir;

    fn manifest(text: &str) -> RomeManifest {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn cli_parses_build_flags() {
        let cli = Cli::try_parse_from([
            "rome",
            "-v",
            "build",
            "--configuration",
            "both",
            "--no-dsym",
            "--report",
            "out.json",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Build {
                configuration,
                no_dsym,
                report,
                ..
            } => {
                assert_eq!(configuration, Some(ConfigurationArg::Both));
                assert!(no_dsym);
                assert_eq!(report, Some(PathBuf::from("out.json")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn cli_flags_override_manifest_options() {
        let temp = TempDir::new().unwrap();
        let manifest = manifest(
            "[options]\ndsym = true\nconfiguration = \"Release\"\npre_compile = \"true\"\n",
        );

        let options = hook_options(&manifest, temp.path(), None, false).unwrap();
        assert_eq!(
            options.configuration,
            ConfigurationSelection::Single(Configuration::Release)
        );
        assert!(options.dsym);
        assert!(options.pre_compile.is_some());
        assert!(options.post_compile.is_none());

        let options =
            hook_options(&manifest, temp.path(), Some(ConfigurationArg::Both), true).unwrap();
        assert_eq!(options.configuration, ConfigurationSelection::Both);
        assert!(!options.dsym);
    }

    #[cfg(unix)]
    #[test]
    fn shell_hook_reports_failure() {
        let temp = TempDir::new().unwrap();
        let context = InstallerContext::new(temp.path().join("Pods"), Vec::new());

        let ok = shell_hook("pre_compile", "test -n \"$ROME_SANDBOX_ROOT\"", temp.path());
        ok(&context).unwrap();

        let failing = shell_hook("post_compile", "exit 3", temp.path());
        let err = failing(&context).unwrap_err();
        assert!(matches!(err, RomeError::Hook { stage: "post_compile", .. }));
        assert!(err.to_string().contains("exit 3"));
    }

    #[test]
    fn plan_lists_invocations_and_merges() {
        let context = InstallerContext::new(
            "/work/App/Pods",
            vec![
                Target {
                    label: "Pods-App".to_string(),
                    platform: "ios".to_string(),
                    deployment_target: Some("15.0".to_string()),
                    specs: vec![ModuleSpec::named("Alpha"), ModuleSpec::named("Alpha")],
                },
                Target {
                    label: "Pods-Mac".to_string(),
                    platform: "osx".to_string(),
                    deployment_target: None,
                    specs: vec![ModuleSpec::named("Alpha")],
                },
            ],
        );
        let options = HookOptions {
            configuration: ConfigurationSelection::Both,
            ..HookOptions::default()
        };

        let text = render_plan(&context, Path::new("/work/App/Pods/Rome.xcconfig"), &options)
            .unwrap();

        assert!(text.starts_with("Release -> /work/App/Rome/Release\n"));
        assert!(text.contains("Debug -> /work/App/Rome/Debug\n"));
        assert!(text.contains("Pods-App (ios: iphoneos + iphonesimulator)"));
        assert!(text.contains("Pods-Mac (osx: macosx)"));
        assert!(text.contains("-destination generic/platform=iOS Simulator"));
        assert!(text.contains("-xcconfig /work/App/Pods/Rome.xcconfig"));
        assert_eq!(text.matches("merge Alpha").count(), 2);
        assert!(text.ends_with("dSYMs -> /work/App/dSYM\n"));
    }

    #[test]
    fn plan_rejects_unknown_platform() {
        let context = InstallerContext::new(
            "/work/App/Pods",
            vec![Target {
                label: "Pods-Foo".to_string(),
                platform: "foo-os".to_string(),
                deployment_target: None,
                specs: vec![ModuleSpec::named("Alpha")],
            }],
        );
        let err = render_plan(&context, Path::new("Rome.xcconfig"), &HookOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("foo-os"));
    }

    #[test]
    fn report_file_is_stamped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("reports/run.json");
        let report = RunReport {
            passes: vec![PassReport {
                configuration: Configuration::Debug,
                destination: PathBuf::from("/work/App/Rome/Debug"),
                artifacts: vec![PathBuf::from("/work/App/Rome/Debug/Alpha.xcframework")],
                resources: Vec::new(),
                dsyms: Vec::new(),
                skipped: vec![SkippedModule {
                    target: "Pods-App".to_string(),
                    root_name: "Beta".to_string(),
                    reason: SkipReason::MissingSimulatorProduct,
                }],
            }],
        };

        write_report(&path, Path::new("rome.toml"), &report).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let stamp = value["generated_at"].as_str().unwrap();
        assert!(OffsetDateTime::parse(stamp, &Rfc3339).is_ok());
        assert_eq!(value["manifest"], "rome.toml");
        assert_eq!(value["passes"][0]["configuration"], "Debug");
        assert_eq!(
            value["passes"][0]["skipped"][0]["reason"],
            "missing_simulator_product"
        );

        let summary = render_summary(&report);
        assert!(summary.contains("1 artifact(s)"));
        assert!(summary.contains("skipped Beta (Pods-App)"));
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rome.toml");

        cmd_init(&path, "Pods-Demo", PlatformArg::Tvos).unwrap();
        let written = RomeManifest::load_from_file(&path).unwrap();
        assert_eq!(written.targets[0].label, "Pods-Demo");
        assert_eq!(written.targets[0].platform, "tvos");

        let err = cmd_init(&path, "Pods-Demo", PlatformArg::Tvos).unwrap_err();
        assert!(err.to_string().contains("refusing to overwrite"));
    }
}
