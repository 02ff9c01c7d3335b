//! Launcher configuration.
//!
//! Loaded from a TOML file with the following priority:
//! 1. `--config PATH` (must exist)
//! 2. `trainlaunch.toml` in the working directory, if present
//! 3. Default values
//!
//! Every section and field is optional; missing ones take their defaults.

use crate::patch::IndentUnit;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "trainlaunch.toml";

/// Placeholder in `launcher.training` replaced by the detected interpreter.
pub const PYTHON_PLACEHOLDER: &str = "{python}";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    pub network: NetworkConfig,
    pub trace: TraceConfig,
    pub server: ServerConfig,
    pub worker: WorkerConfig,
    pub launcher: LauncherConfig,
    pub patch: PatchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address of the scheduler, shared by every role.
    pub root_uri: String,
    pub root_port: u16,
    pub scheduler_port: u16,
    /// Base port; the server of rank `r` listens on `server_port + r`.
    pub server_port: u16,
    /// Base port; the worker of rank `r` listens on `worker_port + r`.
    pub worker_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            root_uri: "127.0.0.1".to_string(),
            root_port: 9000,
            scheduler_port: 9000,
            server_port: 9100,
            worker_port: 9200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    pub enabled: bool,
    pub start_step: u64,
    pub end_step: u64,
    pub dir: PathBuf,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start_step: 0,
            end_step: 10,
            dir: PathBuf::from("traces"),
        }
    }
}

/// Settings only the server role receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub log_path: PathBuf,
    pub key_dict_path: PathBuf,
    pub enable_profile: bool,
    pub profile_output_path: PathBuf,
    pub heap_profile_prefix: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("traces/server.log"),
            key_dict_path: PathBuf::from("traces/key_dict.txt"),
            enable_profile: false,
            profile_output_path: PathBuf::from("traces/server_profile.json"),
            heap_profile_prefix: PathBuf::from("traces/heap"),
        }
    }
}

/// Settings only the worker role receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub visible_devices: String,
    pub local_rank: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            visible_devices: "0".to_string(),
            local_rank: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Per-role launcher command. Empty: re-run this binary's `role` subcommand.
    pub program: Vec<String>,
    /// Training entry point run by the per-role launcher.
    pub training: Vec<String>,
    pub training_args: Vec<String>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            program: Vec::new(),
            training: vec![
                PYTHON_PLACEHOLDER.to_string(),
                "-m".to_string(),
                "byteps.launcher.launch".to_string(),
            ],
            training_args: Vec::new(),
        }
    }
}

/// Worker-side patch of the installed framework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchConfig {
    pub enabled: bool,
    /// Python package owning the target file.
    pub package: String,
    /// Target path relative to the package directory.
    pub relative_path: PathBuf,
    pub start_marker: String,
    pub end_marker: String,
    pub indent_level: usize,
    pub indent_unit: IndentUnit,
    /// File with the block to insert; the built-in trace snippet if unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_file: Option<PathBuf>,
    pub skip_if_applied: bool,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            package: "mxnet".to_string(),
            relative_path: PathBuf::from("module/executor_group.py"),
            start_marker: "        self.arg_names = symbol.list_arguments()".to_string(),
            end_marker: "        self.aux_names = symbol.list_auxiliary_states()".to_string(),
            indent_level: 2,
            indent_unit: IndentUnit::default(),
            content_file: None,
            skip_if_applied: false,
        }
    }
}

impl LaunchConfig {
    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parse config file {}", path.display()))
    }

    /// Resolve the config: explicit path, then `trainlaunch.toml`, then defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            tracing::debug!(path = DEFAULT_CONFIG_FILE, "using config from working directory");
            return Self::load_from(fallback);
        }
        Ok(Self::default())
    }
}
