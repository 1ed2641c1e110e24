use thiserror::Error;

use crate::process::ProcessError;

/// Error types for mixer commands.
#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("Mixer command error: {0}")]
    Process(#[from] ProcessError),
    #[error("Could not parse volume from mixer output: {0}")]
    Parse(String),
    #[error("Interrupted by shutdown while waiting for: {0}")]
    Interrupted(String),
}
