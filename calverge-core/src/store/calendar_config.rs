//! Per-calendar local configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CalvergeError, CalvergeResult};

const CONFIG_DIR: &str = ".calverge";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_SOURCE: &str = "Local";

/// Configuration stored in each calendar's .calverge/config.toml
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct CalendarConfig {
    /// Display title; the directory name when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub read_only: bool,

    /// Title of the account the calendar belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl CalendarConfig {
    /// Load config from .calverge/config.toml
    pub fn load(calendar_dir: &Path) -> CalvergeResult<Self> {
        let path = calendar_dir.join(CONFIG_DIR).join(CONFIG_FILE);

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content).map_err(|e| {
                CalvergeError::Config(format!("Invalid {}: {e}", path.display()))
            })
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to .calverge/config.toml
    pub fn save(&self, calendar_dir: &Path) -> CalvergeResult<()> {
        let dir = calendar_dir.join(CONFIG_DIR);
        std::fs::create_dir_all(&dir)?;

        let content =
            toml::to_string_pretty(self).map_err(|e| CalvergeError::Config(e.to_string()))?;

        std::fs::write(dir.join(CONFIG_FILE), content)?;

        Ok(())
    }

    pub fn source_title(&self) -> &str {
        self.source.as_deref().unwrap_or(DEFAULT_SOURCE)
    }
}
