//! Host platform (linux for example) utility functions

use std::path::PathBuf;
use thiserror::Error;

/// Name of the environment variable pointing at the software root directory.
pub const SW_ROOT_ENV_VAR: &str = "MERLIN_FC_ROOT";

/// Errors associated with the host environment.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("The software root environment variable (MERLIN_FC_ROOT) is not set")]
    SwRootNotSet
}

/// Get the root directory of the flight software.
///
/// The root is read from the `MERLIN_FC_ROOT` environment variable and is the
/// directory containing `params` and `sessions`.
pub fn get_fc_root() -> Result<PathBuf, HostError> {
    match std::env::var(SW_ROOT_ENV_VAR) {
        Ok(p) => Ok(PathBuf::from(p)),
        Err(_) => Err(HostError::SwRootNotSet)
    }
}
