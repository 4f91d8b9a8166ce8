//! # Core Configuration
//!
//! Loaded from TOML. Every section and field has a default, so an empty
//! file is a valid configuration.
//!
//! ```toml
//! [world]
//! initial_capacity = 4096
//!
//! [events]
//! capacity = 256
//! policy = "drop_newest"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::events::ChannelConfig;

/// World sizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Expected number of positioned entities; presizes the spatial index.
    pub initial_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
        }
    }
}

/// Configuration for the core substrate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// World sizing.
    pub world: WorldConfig,
    /// Default capacity and overflow policy of every event kind.
    pub events: ChannelConfig,
}

impl CoreConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> CoreResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Rejects values the core cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.events.capacity == 0 {
            return Err(CoreError::InvalidConfig(
                "events.capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::OverflowPolicy;

    #[test]
    fn test_empty_document_is_default() {
        let config = CoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.events.policy, OverflowPolicy::DropOldest);
    }

    #[test]
    fn test_partial_sections() {
        let config = CoreConfig::from_toml_str(
            r#"
            [events]
            capacity = 8
            policy = "unbounded"
            "#,
        )
        .unwrap();
        assert_eq!(config.events.capacity, 8);
        assert_eq!(config.events.policy, OverflowPolicy::Unbounded);
        assert_eq!(config.world, WorldConfig::default());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = CoreConfig::from_toml_str("[events]\ncapacity = 0\n").unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[test]
    fn test_unknown_policy_is_parse_error() {
        let err = CoreConfig::from_toml_str("[events]\npolicy = \"block\"\n").unwrap_err();
        assert!(matches!(err, CoreError::ConfigParse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = CoreConfig::from_file("/nonexistent/tessera.toml").unwrap_err();
        assert!(matches!(err, CoreError::ConfigIo(_)));
    }
}
