//! Calendar references handed out by a store.

use std::fmt;

/// A calendar as seen by the sync engine.
///
/// Only stores construct these; the engine treats them as immutable for the
/// duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarRef {
    pub id: String,
    pub title: String,
    pub writable: bool,
    /// Title of the account or source that owns the calendar
    pub source: String,
}

impl CalendarRef {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        writable: bool,
        source: impl Into<String>,
    ) -> Self {
        CalendarRef {
            id: id.into(),
            title: title.into(),
            writable,
            source: source.into(),
        }
    }
}

impl fmt::Display for CalendarRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}
