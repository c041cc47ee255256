//! Runtime configuration
//!
//! One flat configuration struct with serde support, loadable from TOML.
//! Every field has a default so partial files work.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Runtime configuration for a simulation world
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Target frame rate in frames per second
    pub desired_frame_rate: f32,

    /// Report the measured frame rate every this many completed frames
    pub rate_report_interval: u64,

    /// Capacity of the scene-change funnel into the graphics thread;
    /// producers block when it is full
    pub change_queue_capacity: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            desired_frame_rate: 60.0,
            rate_report_interval: 120,
            change_queue_capacity: 256,
        }
    }
}

impl SimConfig {
    /// The frame interval implied by the desired frame rate
    ///
    /// A non-positive rate yields a zero interval (uncapped).
    pub fn frame_interval(&self) -> Duration {
        if self.desired_frame_rate > 0.0 {
            Duration::from_secs_f64(1.0 / f64::from(self.desired_frame_rate))
        } else {
            Duration::ZERO
        }
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = SimConfig::from_toml_str("desired_frame_rate = 30.0").unwrap();
        assert_eq!(config.desired_frame_rate, 30.0);
        assert_eq!(config.rate_report_interval, 120);
        assert_eq!(config.change_queue_capacity, 256);
    }

    #[test]
    fn frame_interval_matches_rate() {
        let config = SimConfig {
            desired_frame_rate: 30.0,
            ..SimConfig::default()
        };
        let ms = config.frame_interval().as_secs_f64() * 1000.0;
        assert!((ms - 33.333).abs() < 0.01);
    }

    #[test]
    fn uncapped_rate_means_zero_interval() {
        let config = SimConfig {
            desired_frame_rate: 0.0,
            ..SimConfig::default()
        };
        assert_eq!(config.frame_interval(), Duration::ZERO);
    }
}
