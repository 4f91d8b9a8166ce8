//! # Runtime Error Types

use thiserror::Error;

use tessera_core::CoreError;

/// Errors raised while setting up or running the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Error from the core substrate (configuration, missing resource).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Configuration parsed but holds unusable values.
    #[error("invalid runtime configuration: {0}")]
    InvalidConfig(String),

    /// A background thread could not be started.
    #[error("failed to spawn thread `{name}`: {source}")]
    Spawn {
        /// Thread name.
        name: String,
        /// OS error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
