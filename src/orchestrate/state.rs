use crate::topology::Role;
use std::fmt;

/// Launcher progress. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LaunchState {
    Init,
    Configured,
    SchedulerLaunched,
    ServerLaunched,
    WorkerLaunched,
    Waiting,
    Done,
}

impl LaunchState {
    pub fn launched(role: Role) -> Self {
        match role {
            Role::Scheduler => LaunchState::SchedulerLaunched,
            Role::Server => LaunchState::ServerLaunched,
            Role::Worker => LaunchState::WorkerLaunched,
        }
    }
}

impl fmt::Display for LaunchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LaunchState::Init => "init",
            LaunchState::Configured => "configured",
            LaunchState::SchedulerLaunched => "scheduler_launched",
            LaunchState::ServerLaunched => "server_launched",
            LaunchState::WorkerLaunched => "worker_launched",
            LaunchState::Waiting => "waiting",
            LaunchState::Done => "done",
        };
        f.write_str(s)
    }
}

/// Tracks the current state and logs each transition.
#[derive(Debug)]
pub struct StateMachine {
    state: LaunchState,
    history: Vec<LaunchState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: LaunchState::Init,
            history: vec![LaunchState::Init],
        }
    }

    pub fn state(&self) -> LaunchState {
        self.state
    }

    pub fn history(&self) -> &[LaunchState] {
        &self.history
    }

    pub fn advance(&mut self, next: LaunchState) {
        debug_assert!(
            next > self.state,
            "launch state must move forward: {} -> {}",
            self.state,
            next
        );
        tracing::debug!(from = %self.state, to = %next, "launch state");
        self.state = next;
        self.history.push(next);
    }
}
