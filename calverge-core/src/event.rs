//! Store-neutral event types.
//!
//! `Event` is what a store persists. `EventSnapshot` is the read-only view of
//! a stored event handed to the reconciler, and `SyncedEventDraft` is what the
//! reconciler asks a store to create.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::fmt;

/// Opaque handle a store uses to find an event again (e.g. a file path).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventHandle(String);

impl EventHandle {
    pub fn new(value: impl Into<String>) -> Self {
        EventHandle(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventTime {
    Date(NaiveDate),
    DateTimeUtc(DateTime<Utc>),
    /// No timezone attached; interpreted in the local zone
    DateTimeFloating(NaiveDateTime),
    DateTimeZoned {
        datetime: NaiveDateTime,
        tzid: String,
    },
}

impl EventTime {
    /// Resolve to an instant. All-day dates resolve to local midnight.
    /// Returns None for unknown TZIDs or nonexistent local times.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            EventTime::Date(d) => local_to_utc(&d.and_hms_opt(0, 0, 0)?),
            EventTime::DateTimeUtc(dt) => Some(*dt),
            EventTime::DateTimeFloating(dt) => local_to_utc(dt),
            EventTime::DateTimeZoned { datetime, tzid } => {
                let tz: chrono_tz::Tz = tzid.parse().ok()?;
                tz.from_local_datetime(datetime)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
            }
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// Build the stored form of an instant: a local date for all-day events,
    /// a UTC datetime otherwise.
    pub fn from_instant(instant: DateTime<Utc>, all_day: bool) -> Self {
        if all_day {
            EventTime::Date(instant.with_timezone(&Local).date_naive())
        } else {
            EventTime::DateTimeUtc(instant)
        }
    }
}

fn local_to_utc(naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventTime::DateTimeUtc(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M UTC")),
            EventTime::DateTimeFloating(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
            EventTime::DateTimeZoned { datetime, tzid } => {
                write!(f, "{} {}", datetime.format("%Y-%m-%d %H:%M"), tzid)
            }
        }
    }
}

/// Recurrence rule of a master event. Copied verbatim, never expanded.
#[derive(Debug, Clone, PartialEq)]
pub struct Recurrence {
    pub rrule: String,
    pub exdates: Vec<EventTime>,
}

/// A reminder/alarm for an event
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    /// Minutes before the event to trigger
    pub minutes: i64,
}

/// A stored calendar event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub uid: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    pub recurrence: Option<Recurrence>,
    pub reminders: Vec<Reminder>,
}

/// Read-only view of an event as seen by the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSnapshot {
    pub handle: EventHandle,
    /// Stable identifier of the event within its store
    pub event_id: Option<String>,
    pub calendar_id: String,
    pub title: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub recurrence: Option<Recurrence>,
    pub alarms: Vec<Reminder>,
}

impl EventSnapshot {
    /// Title used in log lines and failure reports
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Unknown")
    }
}

/// An event the reconciler wants created in the target calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncedEventDraft {
    pub calendar_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub title: Option<String>,
    pub location: Option<String>,
    /// Always ends with a provenance tag block
    pub notes: String,
    pub recurrence: Option<Recurrence>,
    pub alarms: Vec<Reminder>,
}

impl SyncedEventDraft {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Unknown")
    }
}
