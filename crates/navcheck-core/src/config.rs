//! Persistent configuration for navcheck.
//!
//! Settings live in `~/.navcheck/config.json`: where the agent listens, the
//! timing constants the guidance helpers poll with, and the app palette they
//! compare colors against. Every section is optional; missing keys fall back
//! to the defaults.
//!
//! # Example
//!
//! ```no_run
//! use navcheck_core::config::NavcheckConfig;
//!
//! let config = NavcheckConfig::load();
//! println!("agent at {}:{}", config.agent.host, config.agent.port);
//! println!("short wait: {:?}", config.timings.short_wait());
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::Palette;
use crate::simulation::SimulationSettings;

const CONFIG_FILENAME: &str = "config.json";

/// Returns the navcheck state directory (`~/.navcheck/`), creating it if needed.
///
/// Falls back to the system temp directory when no home directory is known.
pub fn navcheck_dir() -> PathBuf {
    let dir = dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".navcheck");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Errors that can occur when loading an explicit config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Where the automation agent listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub host: String,
    pub port: u16,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9800,
        }
    }
}

/// Timing constants used by the guidance helpers, in seconds (speeds in m/s).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub short_wait_secs: f64,
    pub long_wait_secs: f64,
    pub medium_poll_interval_secs: f64,
    pub long_poll_interval_secs: f64,
    /// Timeout for an element to appear before it is acted on.
    pub visibility_timeout_secs: f64,
    /// Position update interval that leaves the app idle often enough to be driven.
    pub normal_update_interval_secs: f64,
    /// Position update interval used together with the fast speed.
    pub slow_update_interval_secs: f64,
    pub normal_simulation_speed: f64,
    pub fast_simulation_speed: f64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            short_wait_secs: 10.0,
            long_wait_secs: 60.0,
            medium_poll_interval_secs: 0.5,
            long_poll_interval_secs: 1.0,
            visibility_timeout_secs: 10.0,
            normal_update_interval_secs: 2.0,
            slow_update_interval_secs: 4.0,
            normal_simulation_speed: 15.0,
            fast_simulation_speed: 40.0,
        }
    }
}

/// Converts seconds to a [`Duration`], clamping negative and non-finite values to zero.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

impl Timings {
    pub fn short_wait(&self) -> Duration {
        secs(self.short_wait_secs)
    }

    pub fn long_wait(&self) -> Duration {
        secs(self.long_wait_secs)
    }

    pub fn medium_poll_interval(&self) -> Duration {
        secs(self.medium_poll_interval_secs)
    }

    pub fn long_poll_interval(&self) -> Duration {
        secs(self.long_poll_interval_secs)
    }

    pub fn visibility_timeout(&self) -> Duration {
        secs(self.visibility_timeout_secs)
    }

    /// How long it takes the views to reflect one simulated position update.
    pub fn views_update_delay(&self) -> Duration {
        secs(self.normal_update_interval_secs + 1.0)
    }

    /// Settings that keep the simulation slow enough for UI automation.
    pub fn normal_simulation(&self) -> SimulationSettings {
        SimulationSettings {
            update_interval: self.normal_update_interval_secs,
            movement_speed: self.normal_simulation_speed,
        }
    }

    /// Settings that move along the route faster at a lower update rate.
    pub fn fast_simulation(&self) -> SimulationSettings {
        SimulationSettings {
            update_interval: self.slow_update_interval_secs,
            movement_speed: self.fast_simulation_speed,
        }
    }
}

/// Persistent navcheck configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavcheckConfig {
    pub agent: AgentConfig,
    pub timings: Timings,
    pub palette: Palette,
}

impl NavcheckConfig {
    /// Load config from `~/.navcheck/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(navcheck_dir().join(CONFIG_FILENAME)).unwrap_or_default()
    }

    /// Load config from an explicit path, reporting read and parse failures.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save config to `~/.navcheck/config.json`.
    pub fn save(&self) -> std::io::Result<()> {
        let path = navcheck_dir().join(CONFIG_FILENAME);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}
