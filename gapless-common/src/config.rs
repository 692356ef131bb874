//! Configuration file resolution and loading
//!
//! The configuration file is located following this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. `<platform config dir>/<app>/config.toml`
//! 4. None: built-in defaults are used
//!
//! An explicitly requested file (1 or 2) that does not exist is an error. A
//! missing file at the default location is normal and yields defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "GAPLESS_CONFIG";

/// Logging configuration shared by every binary in the workspace
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level or EnvFilter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Where the configuration file came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--config` command-line argument
    CommandLine(PathBuf),
    /// Environment variable
    Environment(PathBuf),
    /// Platform default location (may not exist)
    DefaultLocation(PathBuf),
    /// No file; built-in defaults only
    BuiltIn,
}

impl ConfigSource {
    /// Path of the configuration file, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::CommandLine(p)
            | ConfigSource::Environment(p)
            | ConfigSource::DefaultLocation(p) => Some(p),
            ConfigSource::BuiltIn => None,
        }
    }

    fn is_explicit(&self) -> bool {
        matches!(
            self,
            ConfigSource::CommandLine(_) | ConfigSource::Environment(_)
        )
    }
}

/// Resolves the configuration file for one application
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    app_name: String,
    env_var: String,
}

impl ConfigResolver {
    /// Create a resolver using [`CONFIG_ENV_VAR`]
    pub fn new(app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            env_var: CONFIG_ENV_VAR.to_string(),
        }
    }

    /// Override the environment variable consulted at priority 2
    pub fn with_env_var(mut self, env_var: &str) -> Self {
        self.env_var = env_var.to_string();
        self
    }

    /// Platform default configuration file path
    pub fn default_path(&self) -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(&self.app_name).join("config.toml"))
    }

    /// Determine which configuration file applies
    pub fn resolve(&self, cli_arg: Option<&Path>) -> ConfigSource {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return ConfigSource::CommandLine(path.to_path_buf());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(&self.env_var) {
            if !path.is_empty() {
                return ConfigSource::Environment(PathBuf::from(path));
            }
        }

        // Priority 3: Platform default location
        match self.default_path() {
            Some(path) => ConfigSource::DefaultLocation(path),
            None => ConfigSource::BuiltIn,
        }
    }

    /// Resolve and load the configuration, falling back to `T::default()`
    pub fn load<T>(&self, cli_arg: Option<&Path>) -> Result<(T, ConfigSource)>
    where
        T: DeserializeOwned + Default,
    {
        let source = self.resolve(cli_arg);

        let config = match source.path() {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                load_toml(path)?
            }
            Some(path) if source.is_explicit() => {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            Some(path) => {
                debug!(
                    "No config file at {}, using built-in defaults",
                    path.display()
                );
                T::default()
            }
            None => T::default(),
        };

        Ok((config, source))
    }
}

/// Parse a TOML file into `T`
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}
