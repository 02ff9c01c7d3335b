//! Environment variables handed to each role process.
//!
//! A `RoleEnv` is built once per role and applied to that role's `Command`
//! only. The parent's own environment is never modified, so launching one
//! role cannot observe values meant for another.

use crate::topology::role::Role;
use anyhow::{Context, anyhow};
use serde::Serialize;
use std::collections::BTreeMap;

pub const RANK: &str = "RANK";
pub const NUM_WORKERS: &str = "NUM_WORKERS";
pub const NUM_SERVERS: &str = "NUM_SERVERS";

pub const DMLC_ROLE: &str = "DMLC_ROLE";
pub const DMLC_WORKER_ID: &str = "DMLC_WORKER_ID";
pub const DMLC_NUM_WORKER: &str = "DMLC_NUM_WORKER";
pub const DMLC_NUM_SERVER: &str = "DMLC_NUM_SERVER";
pub const DMLC_PS_ROOT_URI: &str = "DMLC_PS_ROOT_URI";
pub const DMLC_PS_ROOT_PORT: &str = "DMLC_PS_ROOT_PORT";
pub const DMLC_PORT: &str = "DMLC_PORT";

pub const TRACE_ON: &str = "TRACE_ON";
pub const TRACE_START_STEP: &str = "TRACE_START_STEP";
pub const TRACE_END_STEP: &str = "TRACE_END_STEP";
pub const TRACE_DIR: &str = "TRACE_DIR";

// Server only.
pub const SERVER_LOG_PATH: &str = "BYTEPS_SERVER_LOG_PATH";
pub const KEY_DICT_PATH: &str = "BYTEPS_KEY_DICT_PATH";
pub const SERVER_ENABLE_PROFILE: &str = "BYTEPS_SERVER_ENABLE_PROFILE";
pub const SERVER_PROFILE_OUTPUT_PATH: &str = "BYTEPS_SERVER_PROFILE_OUTPUT_PATH";
pub const HEAPPROFILE: &str = "HEAPPROFILE";

// Worker only.
pub const VISIBLE_DEVICES: &str = "NVIDIA_VISIBLE_DEVICES";
pub const LOCAL_RANK: &str = "BYTEPS_LOCAL_RANK";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleEnv {
    pub role: Role,
    pub vars: BTreeMap<String, String>,
}

impl RoleEnv {
    pub fn new(role: Role) -> Self {
        let mut vars = BTreeMap::new();
        vars.insert(DMLC_ROLE.to_string(), role.to_string());
        Self { role, vars }
    }

    pub(crate) fn set(&mut self, key: &str, value: impl ToString) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

/// Read the role a per-role launcher was started for.
pub fn role_from_env(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Role> {
    let raw = lookup(DMLC_ROLE).ok_or_else(|| anyhow!("{} is not set", DMLC_ROLE))?;
    raw.parse::<Role>()
        .with_context(|| format!("bad {} value", DMLC_ROLE))
}

/// `ON` / `OFF`, the form the trace recorder compares against.
pub fn on_off(flag: bool) -> &'static str {
    if flag { "ON" } else { "OFF" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn new_env_carries_role() {
        let env = RoleEnv::new(Role::Server);
        assert_eq!(env.get(DMLC_ROLE), Some("server"));
    }

    #[test]
    fn role_lookup() {
        let vars: HashMap<&str, &str> = [(DMLC_ROLE, "worker")].into_iter().collect();
        let role = role_from_env(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(role, Role::Worker);

        let missing = role_from_env(|_| None).unwrap_err();
        assert!(missing.to_string().contains(DMLC_ROLE));

        let bad = role_from_env(|_| Some("boss".to_string())).unwrap_err();
        assert!(format!("{:#}", bad).contains("boss"));
    }
}
