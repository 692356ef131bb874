//! gapless-ap configuration
//!
//! Bootstrap settings read from `config.toml` (see
//! [`gapless_common::config`] for file resolution). Every section and field is
//! optional; command-line flags override file values.
//!
//! ```toml
//! [audio]
//! device = "default"
//! buffer_size = 512
//!
//! [events]
//! capacity = 256
//!
//! [logging]
//! level = "debug"
//! ```

use crate::error::Result;
use gapless_common::config::{ConfigResolver, ConfigSource, LoggingConfig};
use serde::Deserialize;
use std::path::Path;

/// Default event bus capacity per subscriber
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Audio Player configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    pub audio: AudioConfig,
    pub events: EventsConfig,
    pub logging: LoggingConfig,
}

/// Output device settings
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device name (None = system default)
    pub device: Option<String>,
    /// Device buffer size in frames (None = device default)
    pub buffer_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EventsConfig {
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl PlayerConfig {
    /// Resolve and load the configuration file
    ///
    /// `cli_path` is the `--config` argument, if given.
    pub fn load(cli_path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        Ok(ConfigResolver::new("gapless").load(cli_path)?)
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, device: Option<String>, log_level: Option<String>) -> Self {
        if device.is_some() {
            self.audio.device = device;
        }
        if let Some(level) = log_level {
            self.logging.level = level;
        }
        self
    }
}
