use crate::topology::Role;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("failed to spawn {role} process: {source}")]
    Spawn {
        role: Role,
        #[source]
        source: io::Error,
    },

    #[error("failed to determine current executable: {0}")]
    CurrentExe(#[source] io::Error),
}
