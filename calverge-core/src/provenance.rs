//! Provenance tags embedded in event notes.
//!
//! Stores have no custom-field support, so synced events carry their origin
//! as a delimited text block at the end of the notes:
//!
//! ```text
//!
//! ---
//! Synced by Calverge CLI
//! Config: Work to Personal
//! Mode: full
//! Source: work
//! Original: 7F3A...
//! Sync ID: 1b4e28ba-2fa1-41d2-883f-0016d3cca427
//! Synced: 2025-06-25T10:00:00Z
//! ---
//! ```
//!
//! An event is an artifact of source `S` iff its notes contain the marker
//! line and a line equal to `Source: S`. This grammar is shared with events
//! tagged by earlier releases and must stay stable.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::sync_config::{SyncConfiguration, SyncMode};

pub const MARKER: &str = "Synced by Calverge CLI";
const SEPARATOR: &str = "---";
const UNKNOWN_ORIGINAL: &str = "unknown";

const CONFIG_KEY: &str = "Config: ";
const MODE_KEY: &str = "Mode: ";
const SOURCE_KEY: &str = "Source: ";
const ORIGINAL_KEY: &str = "Original: ";
const SYNC_ID_KEY: &str = "Sync ID: ";
const SYNCED_KEY: &str = "Synced: ";

#[derive(Debug, Clone, PartialEq)]
pub struct ProvenanceTag {
    pub config_name: String,
    pub mode: SyncMode,
    pub source_id: String,
    pub original_id: Option<String>,
    pub sync_id: Uuid,
    pub synced_at: DateTime<Utc>,
}

impl ProvenanceTag {
    /// A tag with a fresh sync id.
    pub fn new(
        config: &SyncConfiguration,
        source_id: &str,
        original_id: Option<&str>,
        synced_at: DateTime<Utc>,
    ) -> Self {
        ProvenanceTag {
            config_name: config.display_name().to_string(),
            mode: config.sync_mode,
            source_id: source_id.to_string(),
            original_id: original_id.map(str::to_string),
            sync_id: Uuid::new_v4(),
            synced_at,
        }
    }

    /// Render the tag block. Starts with a newline so it can be appended
    /// directly to existing notes.
    pub fn encode(&self) -> String {
        format!(
            "\n{SEPARATOR}\n{MARKER}\n{CONFIG_KEY}{}\n{MODE_KEY}{}\n{SOURCE_KEY}{}\n{ORIGINAL_KEY}{}\n{SYNC_ID_KEY}{}\n{SYNCED_KEY}{}\n{SEPARATOR}",
            single_line(&self.config_name),
            self.mode,
            single_line(&self.source_id),
            single_line(self.original_id.as_deref().unwrap_or(UNKNOWN_ORIGINAL)),
            self.sync_id.hyphenated().to_string().to_uppercase(),
            self.synced_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }

    /// Parse the trailing tag block of `notes`, if there is a complete one.
    pub fn decode(notes: &str) -> Option<Self> {
        let lines: Vec<&str> = notes.lines().map(str::trim).collect();

        let close = lines.iter().rposition(|l| *l == SEPARATOR)?;
        let open = lines[..close]
            .iter()
            .rposition(|l| *l == SEPARATOR)
            .filter(|open| lines.get(open + 1) == Some(&MARKER))?;

        let body = &lines[open + 2..close];
        let field = |key: &str| {
            body.iter()
                .find_map(|l| l.strip_prefix(key.trim_end()).map(str::trim))
        };

        let original_id = field(ORIGINAL_KEY)
            .filter(|id| *id != UNKNOWN_ORIGINAL)
            .map(str::to_string);

        Some(ProvenanceTag {
            config_name: field(CONFIG_KEY)?.to_string(),
            mode: field(MODE_KEY)?.parse().ok()?,
            source_id: field(SOURCE_KEY)?.to_string(),
            original_id,
            sync_id: Uuid::parse_str(field(SYNC_ID_KEY)?).ok()?,
            synced_at: parse_timestamp(field(SYNCED_KEY)?)?,
        })
    }
}

/// Each field must stay on its own line, or it could forge other fields.
fn single_line(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// True iff `notes` carries a provenance tag for `source_id`.
pub fn matches(notes: &str, source_id: &str) -> bool {
    let source_line = format!("{SOURCE_KEY}{source_id}");

    let mut has_marker = false;
    let mut has_source = false;

    for line in notes.lines().map(str::trim) {
        has_marker |= line == MARKER;
        has_source |= line == source_line;
    }

    has_marker && has_source
}

/// Attach a tag block to an event's notes.
pub fn append(original_notes: Option<&str>, tag_block: &str, preserve_original: bool) -> String {
    match original_notes {
        Some(notes) if preserve_original && !notes.is_empty() => format!("{notes}{tag_block}"),
        _ => tag_block.to_string(),
    }
}

/// RFC 3339, or the `+0200` offset form written by earlier releases.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
