//! # Runtime Configuration
//!
//! Extends the core configuration with loop timing. The core sections sit
//! at the top level of the same file:
//!
//! ```toml
//! tick_rate_hz = 30
//! max_frame_delta_ms = 250
//!
//! [events]
//! capacity = 512
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tessera_core::{CoreConfig, CoreError};

use crate::error::{RuntimeError, RuntimeResult};
use crate::tick::TickLoop;

/// Configuration for the game loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Simulation ticks per second.
    pub tick_rate_hz: u32,
    /// Largest wall-clock gap the loop catches up on after a stall.
    pub max_frame_delta_ms: u64,
    /// Core substrate settings.
    #[serde(flatten)]
    pub core: CoreConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 20,
            max_frame_delta_ms: 250,
            core: CoreConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> RuntimeResult<Self> {
        let config: Self = toml::from_str(text).map_err(CoreError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> RuntimeResult<Self> {
        let text = std::fs::read_to_string(path).map_err(CoreError::from)?;
        Self::from_toml_str(&text)
    }

    /// Rejects values the runtime cannot run with.
    pub fn validate(&self) -> RuntimeResult<()> {
        if self.tick_rate_hz == 0 {
            return Err(RuntimeError::InvalidConfig(
                "tick_rate_hz must be greater than zero".into(),
            ));
        }
        if self.tick_rate_hz > TickLoop::MAX_TICK_RATE {
            return Err(RuntimeError::InvalidConfig(format!(
                "tick_rate_hz {} exceeds {}",
                self.tick_rate_hz,
                TickLoop::MAX_TICK_RATE
            )));
        }
        if self.max_frame_delta_ms == 0 {
            return Err(RuntimeError::InvalidConfig(
                "max_frame_delta_ms must be greater than zero".into(),
            ));
        }
        self.core.validate()?;
        Ok(())
    }

    /// Wall-clock length of one tick.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.tick_rate_hz.max(1)))
    }

    /// Catch-up limit as a duration.
    #[must_use]
    pub fn max_frame_delta(&self) -> Duration {
        Duration::from_millis(self.max_frame_delta_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::OverflowPolicy;

    #[test]
    fn test_flat_document() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            tick_rate_hz = 50

            [events]
            capacity = 64
            policy = "drop_newest"
            "#,
        )
        .unwrap();
        assert_eq!(config.tick_rate_hz, 50);
        assert_eq!(config.max_frame_delta_ms, 250);
        assert_eq!(config.core.events.capacity, 64);
        assert_eq!(config.core.events.policy, OverflowPolicy::DropNewest);
        assert_eq!(config.tick_duration(), Duration::from_millis(20));
    }

    #[test]
    fn test_zero_rate_rejected() {
        let err = RuntimeConfig::from_toml_str("tick_rate_hz = 0").unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConfig(_)));
    }

    #[test]
    fn test_core_validation_propagates() {
        let err = RuntimeConfig::from_toml_str("[events]\ncapacity = 0\n").unwrap_err();
        assert!(matches!(err, RuntimeError::Core(CoreError::InvalidConfig(_))));
    }
}
