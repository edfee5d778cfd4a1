//! Errors for the lifecycle and ambient surfaces. The audio path itself
//! never fails: bad input degrades to silence or a no-op.

use std::path::PathBuf;

use thiserror::Error;

use crate::state_machine::SynthState;

#[derive(Error, Debug)]
pub enum SynthError {
    #[error("invalid lifecycle transition: {from} -> {to}")]
    InvalidTransition { from: SynthState, to: SynthState },

    #[error("failed to spawn audio render thread")]
    ThreadSpawn(#[source] std::io::Error),

    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[cfg(feature = "device")]
    #[error("audio device error: {0}")]
    Device(String),
}

pub type Result<T> = std::result::Result<T, SynthError>;
