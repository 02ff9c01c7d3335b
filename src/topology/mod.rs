//! Distributed topology: counts, rank, and the per-role environments derived
//! from them.

pub mod env;
pub mod role;

pub use env::RoleEnv;
pub use role::Role;

use crate::config::{LaunchConfig, NetworkConfig, ServerConfig, TraceConfig, WorkerConfig};
use anyhow::bail;

/// Validated topology for one launcher invocation.
#[derive(Debug, Clone)]
pub struct TopologyConfig {
    pub rank: u32,
    pub num_servers: u32,
    pub num_workers: u32,
    pub network: NetworkConfig,
    pub trace: TraceConfig,
    pub server: ServerConfig,
    pub worker: WorkerConfig,
    /// `DMLC_PORT` of this rank's server and worker, checked to fit in u16.
    pub server_port: u16,
    pub worker_port: u16,
}

/// `base + rank`, or None when that is not a valid TCP port.
fn rank_port(base: u16, rank: u32) -> Option<u16> {
    u32::from(base)
        .checked_add(rank)
        .and_then(|p| u16::try_from(p).ok())
}

impl TopologyConfig {
    /// Check counts and rank, then capture the config sections the role
    /// environments are built from.
    pub fn new(
        rank: u32,
        num_servers: u32,
        num_workers: u32,
        config: &LaunchConfig,
    ) -> anyhow::Result<Self> {
        if num_servers == 0 {
            bail!("number of servers must be positive");
        }
        if num_workers == 0 {
            bail!("number of workers must be positive");
        }
        if rank >= num_workers {
            bail!(
                "rank {} out of range for {} workers (expected 0..{})",
                rank,
                num_workers,
                num_workers
            );
        }
        if config.trace.enabled && config.trace.end_step < config.trace.start_step {
            bail!(
                "trace end step {} is before start step {}",
                config.trace.end_step,
                config.trace.start_step
            );
        }

        let Some(server_port) = rank_port(config.network.server_port, rank) else {
            bail!(
                "server port {} + rank {} exceeds {}",
                config.network.server_port,
                rank,
                u16::MAX
            );
        };
        let Some(worker_port) = rank_port(config.network.worker_port, rank) else {
            bail!(
                "worker port {} + rank {} exceeds {}",
                config.network.worker_port,
                rank,
                u16::MAX
            );
        };

        Ok(Self {
            rank,
            num_servers,
            num_workers,
            network: config.network.clone(),
            trace: config.trace.clone(),
            server: config.server.clone(),
            worker: config.worker.clone(),
            server_port,
            worker_port,
        })
    }

    /// Roles this rank launches, in launch order. Only rank 0 runs the scheduler.
    pub fn roles(&self) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| *role != Role::Scheduler || self.rank == 0)
            .collect()
    }

    fn role_port(&self, role: Role) -> u16 {
        match role {
            Role::Scheduler => self.network.scheduler_port,
            Role::Server => self.server_port,
            Role::Worker => self.worker_port,
        }
    }

    /// Full environment for one role.
    pub fn role_env(&self, role: Role) -> RoleEnv {
        let mut e = RoleEnv::new(role);

        e.set(env::RANK, self.rank);
        e.set(env::DMLC_WORKER_ID, self.rank);
        e.set(env::NUM_WORKERS, self.num_workers);
        e.set(env::DMLC_NUM_WORKER, self.num_workers);
        e.set(env::NUM_SERVERS, self.num_servers);
        e.set(env::DMLC_NUM_SERVER, self.num_servers);
        e.set(env::DMLC_PS_ROOT_URI, &self.network.root_uri);
        e.set(env::DMLC_PS_ROOT_PORT, self.network.root_port);
        e.set(env::DMLC_PORT, self.role_port(role));

        e.set(env::TRACE_ON, env::on_off(self.trace.enabled));
        e.set(env::TRACE_START_STEP, self.trace.start_step);
        e.set(env::TRACE_END_STEP, self.trace.end_step);
        e.set(env::TRACE_DIR, self.trace.dir.display());

        match role {
            Role::Scheduler => {}
            Role::Server => {
                e.set(env::SERVER_LOG_PATH, self.server.log_path.display());
                e.set(env::KEY_DICT_PATH, self.server.key_dict_path.display());
                e.set(
                    env::SERVER_ENABLE_PROFILE,
                    u8::from(self.server.enable_profile),
                );
                e.set(
                    env::SERVER_PROFILE_OUTPUT_PATH,
                    self.server.profile_output_path.display(),
                );
                e.set(env::HEAPPROFILE, self.server.heap_profile_prefix.display());
            }
            Role::Worker => {
                e.set(env::VISIBLE_DEVICES, &self.worker.visible_devices);
                e.set(env::LOCAL_RANK, self.worker.local_rank);
            }
        }

        e
    }

    /// Environments for every role this rank launches, in launch order.
    pub fn role_envs(&self) -> Vec<RoleEnv> {
        self.roles().into_iter().map(|r| self.role_env(r)).collect()
    }
}
