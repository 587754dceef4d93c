//! Global calverge configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{CalvergeError, CalvergeResult};

static DEFAULT_CALENDAR_DIR: &str = "~/calendar";
const DEFAULT_ACCESS_TIMEOUT_SECS: u64 = 30;

fn default_calendar_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CALENDAR_DIR)
}

fn default_access_timeout_secs() -> u64 {
    DEFAULT_ACCESS_TIMEOUT_SECS
}

/// Global configuration at ~/.config/calverge/config.toml
///
/// Every key can be overridden with a `CALVERGE_` environment variable,
/// e.g. `CALVERGE_CALENDAR_DIR`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CalvergeConfig {
    #[serde(default = "default_calendar_dir")]
    pub calendar_dir: PathBuf,

    /// How long to wait for the store to grant access
    #[serde(default = "default_access_timeout_secs")]
    pub access_timeout_secs: u64,
}

impl Default for CalvergeConfig {
    fn default() -> Self {
        CalvergeConfig {
            calendar_dir: default_calendar_dir(),
            access_timeout_secs: DEFAULT_ACCESS_TIMEOUT_SECS,
        }
    }
}

impl CalvergeConfig {
    pub fn config_path() -> CalvergeResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CalvergeError::Config("Could not determine config directory".into()))?
            .join("calverge");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the global config, writing a commented-out default on first run.
    pub fn load() -> CalvergeResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> CalvergeResult<Self> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("CALVERGE"))
            .build()
            .map_err(|e| CalvergeError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CalvergeError::Config(e.to_string()))
    }

    /// Calendar root with `~` expanded.
    pub fn data_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.calendar_dir.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    pub fn access_timeout(&self) -> Duration {
        Duration::from_secs(self.access_timeout_secs)
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> CalvergeResult<()> {
        let contents = format!(
            "\
# calverge configuration

# Where your calendars live:
# calendar_dir = \"{}\"

# Seconds to wait for calendar access before giving up:
# access_timeout_secs = {}
",
            DEFAULT_CALENDAR_DIR, DEFAULT_ACCESS_TIMEOUT_SECS
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CalvergeError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| CalvergeError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
