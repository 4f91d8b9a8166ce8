//! # Core Error Types
//!
//! Most core operations report absence through `Option` or `bool`. The
//! variants here cover the few edges that are genuinely fallible.

use thiserror::Error;

/// Errors raised by the core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A resource the caller depends on was never inserted.
    #[error("missing resource: {0}")]
    MissingResource(&'static str),

    /// Configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// Configuration file is not valid TOML for the expected shape.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration parsed but holds unusable values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = CoreError::MissingResource("TickClock");
        assert_eq!(err.to_string(), "missing resource: TickClock");

        let err = CoreError::InvalidConfig("capacity must be non-zero".into());
        assert_eq!(err.to_string(), "invalid configuration: capacity must be non-zero");
    }
}
