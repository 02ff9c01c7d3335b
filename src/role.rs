//! Per-role launcher: the process the orchestrator starts for each role.
//!
//! For the worker role it patches the installed framework first; a failed
//! patch stops here and the training entry point is never started.

use crate::config::{LaunchConfig, PYTHON_PLACEHOLDER, PatchConfig};
use crate::patch::{self, PatchOutcome, PatchSpec, snippet};
use crate::python;
use crate::topology::{Role, env};
use anyhow::{Context, bail};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Lines of `content_file`, or the built-in trace snippet.
pub fn load_content(content_file: Option<&Path>) -> anyhow::Result<Vec<String>> {
    match content_file {
        Some(path) => Ok(fs::read_to_string(path)
            .with_context(|| format!("read patch content file {}", path.display()))?
            .lines()
            .map(str::to_string)
            .collect()),
        None => Ok(snippet::trace_snippet()),
    }
}

/// Build the PatchSpec for the worker from config and the package location.
pub fn patch_spec(cfg: &PatchConfig, package_dir: &Path) -> anyhow::Result<PatchSpec> {
    let content = load_content(cfg.content_file.as_deref())?;
    Ok(PatchSpec {
        target: package_dir.join(&cfg.relative_path),
        start_marker: cfg.start_marker.clone(),
        end_marker: cfg.end_marker.clone(),
        indent_level: cfg.indent_level,
        indent_unit: cfg.indent_unit,
        content,
    })
}

/// Training command line with `{python}` replaced and extra arguments appended.
pub fn training_command(
    config: &LaunchConfig,
    python: &Path,
    extra_args: &[String],
) -> anyhow::Result<Vec<String>> {
    let interp = python.display().to_string();
    let mut argv: Vec<String> = config
        .launcher
        .training
        .iter()
        .map(|a| a.replace(PYTHON_PLACEHOLDER, &interp))
        .collect();
    if argv.is_empty() {
        bail!("launcher.training is empty; nothing to run");
    }
    argv.extend(config.launcher.training_args.iter().cloned());
    argv.extend(extra_args.iter().cloned());
    Ok(argv)
}

fn patch_worker(config: &LaunchConfig, python: &Path) -> anyhow::Result<PatchOutcome> {
    let dir = python::package_dir(python, &config.patch.package)?;
    let spec = patch_spec(&config.patch, &dir)?;
    let outcome = patch::apply(&spec, config.patch.skip_if_applied)
        .with_context(|| format!("patch {}", spec.target.display()))?;
    Ok(outcome)
}

/// Run one role. `lookup` reads the inherited environment.
///
/// Returns the training process's exit code.
pub fn run_role(
    config: &LaunchConfig,
    python_flag: Option<PathBuf>,
    extra_args: &[String],
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<i32> {
    let role = env::role_from_env(&lookup)?;
    let python = python::detect(
        python_flag.as_deref(),
        lookup(python::PYTHON_ENV).map(Into::into),
        lookup("PATH").map(Into::into),
    )?;
    python::check_version(&python)?;

    if role == Role::Worker && config.patch.enabled {
        patch_worker(config, &python).context("worker patch failed; training not started")?;
    }

    let argv = training_command(config, &python, extra_args)?;
    tracing::info!(%role, command = ?argv, "starting training entry point");

    let status = Command::new(&argv[0])
        .args(&argv[1..])
        .status()
        .with_context(|| format!("start training entry point {}", argv[0]))?;

    if !status.success() {
        tracing::warn!(%role, %status, "training entry point failed");
    }
    Ok(status.code().unwrap_or(1))
}
