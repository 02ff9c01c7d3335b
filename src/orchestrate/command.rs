//! The per-role launcher command.

use crate::config::LauncherConfig;
use crate::orchestrate::error::LaunchError;
use crate::topology::RoleEnv;
use std::path::PathBuf;
use std::process::{Child, Command};

/// Program + arguments started once per role. The role's environment is
/// applied on top of the inherited one at spawn time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl RoleCommand {
    /// Use `launcher.program` if configured, otherwise re-run this binary's
    /// `role` subcommand with `role_args` forwarded.
    pub fn from_config(
        launcher: &LauncherConfig,
        role_args: Vec<String>,
    ) -> Result<Self, LaunchError> {
        if let Some((program, args)) = launcher.program.split_first() {
            return Ok(Self {
                program: PathBuf::from(program),
                args: args.to_vec(),
            });
        }

        let exe = std::env::current_exe().map_err(LaunchError::CurrentExe)?;
        let mut args = vec!["role".to_string()];
        args.extend(role_args);
        Ok(Self { program: exe, args })
    }

    pub fn command(&self, env: &RoleEnv) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).envs(&env.vars);
        cmd
    }

    pub fn spawn(&self, env: &RoleEnv) -> Result<Child, LaunchError> {
        self.command(env).spawn().map_err(|source| LaunchError::Spawn {
            role: env.role,
            source,
        })
    }
}
