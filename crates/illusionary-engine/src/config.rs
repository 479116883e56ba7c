//! Engine configuration.
//!
//! Loaded from JSON. Every field has a default, so a config file only needs
//! the keys it wants to change:
//!
//! ```
//! use illusionary_engine::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "target_fps": 30 }"#).unwrap();
//! assert_eq!(config.target_fps, 30);
//! assert_eq!(config.max_frame_time_ms, 250);
//! ```

use std::path::Path;
use std::time::Duration;

use illusionary_ecs::registry::RegistryConfig;
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Top-level engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frames per second the paced loop aims for. Must be non-zero.
    pub target_fps: u32,
    /// Upper bound on a frame's delta time, so a stall (debugger, window
    /// drag) does not produce one huge simulation step.
    pub max_frame_time_ms: u64,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,
    pub registry: RegistryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            max_frame_time_ms: 250,
            log_filter: "info".to_owned(),
            registry: RegistryConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.target_fps == 0 {
            return Err(EngineError::InvalidConfig(
                "target_fps must be greater than zero".to_owned(),
            ));
        }
        if self.max_frame_time_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "max_frame_time_ms must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }

    /// Seconds per frame at the target rate.
    pub fn frame_dt(&self) -> f64 {
        1.0 / f64::from(self.target_fps)
    }

    /// Wall-clock budget of one frame at the target rate.
    pub fn frame_budget(&self) -> Duration {
        Duration::from_secs_f64(self.frame_dt())
    }

    /// The delta-time clamp, in seconds.
    pub fn max_frame_time(&self) -> f64 {
        Duration::from_millis(self.max_frame_time_ms).as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.target_fps, 60);
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.registry, RegistryConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{ "log_filter": "debug", "registry": { "initial_pool_size": 64 } }"#,
        )
        .unwrap();
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.registry.initial_pool_size, 64);
        assert_eq!(config.registry.pool_growth, 100);
        assert_eq!(config.target_fps, 60);
    }

    #[test]
    fn zero_fps_is_rejected() {
        let err = EngineConfig::from_json_str(r#"{ "target_fps": 0 }"#).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = EngineConfig::from_json_str("{ target_fps: ").unwrap_err();
        assert!(matches!(err, EngineError::Json(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = EngineConfig::from_json_file("/nonexistent/illusionary.json").unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));
    }

    #[test]
    fn derived_timings() {
        let config = EngineConfig {
            target_fps: 50,
            max_frame_time_ms: 100,
            ..Default::default()
        };
        assert!((config.frame_dt() - 0.02).abs() < 1e-12);
        assert_eq!(config.frame_budget(), Duration::from_millis(20));
        assert!((config.max_frame_time() - 0.1).abs() < 1e-12);
    }
}
