//! Sync run configuration.
//!
//! A `SyncConfiguration` is built once per run, either from a JSON file or
//! from command-line flags, and never mutated afterwards.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CalvergeError, CalvergeResult};

const UNNAMED_SYNC: &str = "Unnamed Sync";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SyncMode {
    /// Copy event details (title, location, optionally notes/alarms/recurrence)
    #[default]
    #[serde(rename = "full")]
    Full,
    /// Copy time blocks only, titled "Busy"
    #[serde(rename = "busy-only")]
    BusyOnly,
}

impl SyncMode {
    pub const ALL: [SyncMode; 2] = [SyncMode::Full, SyncMode::BusyOnly];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Full => "full",
            SyncMode::BusyOnly => "busy-only",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SyncMode::Full => "Full event details (title, location, notes, etc.)",
            SyncMode::BusyOnly => "Busy time blocks only (no details)",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = CalvergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyncMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<_> = SyncMode::ALL.iter().map(|m| m.as_str()).collect();
                CalvergeError::InvalidConfiguration(format!(
                    "Invalid sync mode '{}'. Valid options: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

/// What to sync, from where, into where.
///
/// The JSON field names match the config files written for earlier releases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "targetCalendarID")]
    pub target_calendar_id: String,

    #[serde(rename = "sourceCalendarIDs")]
    pub source_calendar_ids: Vec<String>,

    #[serde(rename = "syncMode", default)]
    pub sync_mode: SyncMode,

    #[serde(rename = "includeDetails", default)]
    pub include_details: bool,
}

impl SyncConfiguration {
    /// Full mode, details off.
    pub fn new(target_calendar_id: impl Into<String>, source_calendar_ids: Vec<String>) -> Self {
        SyncConfiguration {
            name: None,
            target_calendar_id: target_calendar_id.into(),
            source_calendar_ids,
            sync_mode: SyncMode::Full,
            include_details: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_mode(mut self, mode: SyncMode) -> Self {
        self.sync_mode = mode;
        self
    }

    pub fn with_details(mut self, include_details: bool) -> Self {
        self.include_details = include_details;
        self
    }

    /// Build from command-line style values. `sources` is comma-separated.
    pub fn from_args(
        name: Option<String>,
        target: &str,
        sources: &str,
        mode: &str,
        include_details: bool,
    ) -> CalvergeResult<Self> {
        let source_calendar_ids = sources
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let config = SyncConfiguration {
            name,
            target_calendar_id: target.trim().to_string(),
            source_calendar_ids,
            sync_mode: mode.parse()?,
            include_details,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> CalvergeResult<Self> {
        let config: SyncConfiguration = serde_json::from_str(json).map_err(|e| {
            CalvergeError::InvalidConfiguration(format!("Invalid JSON configuration: {e}"))
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> CalvergeResult<Self> {
        if !path.exists() {
            return Err(CalvergeError::InvalidConfiguration(format!(
                "Config file not found at '{}'",
                path.display()
            )));
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            CalvergeError::InvalidConfiguration(format!(
                "Could not read config file '{}': {e}",
                path.display()
            ))
        })?;

        Self::from_json(&contents)
    }

    pub fn validate(&self) -> CalvergeResult<()> {
        if self.target_calendar_id.trim().is_empty() {
            return Err(CalvergeError::InvalidConfiguration(
                "Target calendar ID must not be empty".into(),
            ));
        }

        if self
            .name
            .as_deref()
            .is_some_and(|name| name.chars().any(char::is_control))
        {
            return Err(CalvergeError::InvalidConfiguration(
                "Sync name must not contain line breaks or control characters".into(),
            ));
        }

        if self.source_calendar_ids.iter().all(|id| id.trim().is_empty()) {
            return Err(CalvergeError::InvalidConfiguration(
                "At least one source calendar ID is required".into(),
            ));
        }

        Ok(())
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNNAMED_SYNC)
    }
}
