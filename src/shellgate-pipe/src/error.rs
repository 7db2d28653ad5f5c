//! Error types for pipe and process glue.

use shellgate_execpolicy::{ConfigError, Denial};
use thiserror::Error;

/// Errors returned when a shell escape does not produce a stream.
#[derive(Debug, Error)]
pub enum PipeError {
    /// Shell escape is switched off
    #[error("shell escape is disabled")]
    Disabled,

    /// The gate refused the command line
    #[error("{0}")]
    Denied(Denial),

    /// Pipe mode other than `r` or `w`
    #[error("invalid pipe mode: {0:?}")]
    InvalidMode(String),

    /// Configuration could not be read
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The process could not be started
    #[error("failed to start process: {0}")]
    Io(#[from] std::io::Error),
}

impl PipeError {
    /// The gate's denial, if this error is one.
    pub fn denial(&self) -> Option<Denial> {
        match self {
            PipeError::Denied(denial) => Some(*denial),
            _ => None,
        }
    }
}
