//! Process orchestration: spawn one child per role, then wait for all.
//!
//! Spawns are serialized in role order (scheduler, server, worker) and each
//! child gets its own `RoleEnv`. There is no cancellation: a failing child
//! does not stop the others, and a spawn failure only stops further spawns.
//! The launch succeeds only if every spawned child exits successfully.

pub mod command;
pub mod error;
pub mod state;

pub use command::RoleCommand;
pub use error::LaunchError;
pub use state::{LaunchState, StateMachine};

use crate::topology::{Role, RoleEnv, TopologyConfig, env};
use std::fmt;
use std::process::{Child, ExitStatus};

#[derive(Debug)]
pub enum ExitOutcome {
    Exited(ExitStatus),
    WaitFailed(String),
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Exited(status) => write!(f, "{}", status),
            ExitOutcome::WaitFailed(e) => write!(f, "wait failed: {}", e),
        }
    }
}

#[derive(Debug)]
pub struct RoleExit {
    pub role: Role,
    pub pid: u32,
    pub outcome: ExitOutcome,
}

impl RoleExit {
    pub fn success(&self) -> bool {
        matches!(&self.outcome, ExitOutcome::Exited(status) if status.success())
    }
}

#[derive(Debug)]
pub struct LaunchReport {
    pub exits: Vec<RoleExit>,
    pub states: Vec<LaunchState>,
}

impl LaunchReport {
    pub fn success(&self) -> bool {
        self.exits.iter().all(RoleExit::success)
    }

    pub fn failed_roles(&self) -> Vec<Role> {
        self.exits
            .iter()
            .filter(|e| !e.success())
            .map(|e| e.role)
            .collect()
    }

    pub fn launched_roles(&self) -> Vec<Role> {
        self.exits.iter().map(|e| e.role).collect()
    }
}

/// Launch every role of `topology` with `command` and block until all exit.
pub fn launch(topology: &TopologyConfig, command: &RoleCommand) -> Result<LaunchReport, LaunchError> {
    let mut sm = StateMachine::new();
    let envs = topology.role_envs();
    sm.advance(LaunchState::Configured);

    tracing::info!(
        rank = topology.rank,
        num_servers = topology.num_servers,
        num_workers = topology.num_workers,
        roles = ?envs.iter().map(|e| e.role.as_str()).collect::<Vec<_>>(),
        "launching roles"
    );

    let (children, spawn_error) = spawn_in_order(&envs, command, &mut sm);

    sm.advance(LaunchState::Waiting);
    let exits = wait_all(children);
    sm.advance(LaunchState::Done);
    tracing::debug!(state = %sm.state(), children = exits.len(), "launch finished");

    if let Some(err) = spawn_error {
        return Err(err);
    }

    Ok(LaunchReport {
        exits,
        states: sm.history().to_vec(),
    })
}

fn spawn_in_order(
    envs: &[RoleEnv],
    command: &RoleCommand,
    sm: &mut StateMachine,
) -> (Vec<(Role, Child)>, Option<LaunchError>) {
    let mut children = Vec::with_capacity(envs.len());
    for role_env in envs {
        match command.spawn(role_env) {
            Ok(child) => {
                tracing::info!(
                    role = %role_env.role,
                    pid = child.id(),
                    port = role_env.get(env::DMLC_PORT).unwrap_or("-"),
                    "spawned role process"
                );
                children.push((role_env.role, child));
                sm.advance(LaunchState::launched(role_env.role));
            }
            Err(e) => {
                tracing::error!(role = %role_env.role, error = %e, "spawn failed, not launching remaining roles");
                return (children, Some(e));
            }
        }
    }
    (children, None)
}

fn wait_all(children: Vec<(Role, Child)>) -> Vec<RoleExit> {
    let mut exits = Vec::with_capacity(children.len());
    for (role, mut child) in children {
        let pid = child.id();
        let outcome = match child.wait() {
            Ok(status) if status.success() => {
                tracing::info!(%role, pid, "role process exited cleanly");
                ExitOutcome::Exited(status)
            }
            Ok(status) => {
                tracing::warn!(%role, pid, %status, "role process exited with failure");
                ExitOutcome::Exited(status)
            }
            Err(e) => {
                tracing::warn!(%role, pid, error = %e, "error waiting for role process");
                ExitOutcome::WaitFailed(e.to_string())
            }
        };
        exits.push(RoleExit { role, pid, outcome });
    }
    exits
}
