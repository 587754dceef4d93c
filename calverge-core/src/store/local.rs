//! Calendars kept as directories of .ics files.
//!
//! ```text
//! ~/calendar/
//!   work/
//!     .calverge/config.toml      # optional: name, read_only, source
//!     2025-07-01T0900__standup.ics
//!   personal/
//!     ...
//! ```
//!
//! The directory name is the calendar id. Hidden directories are ignored.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use super::CalendarStore;
use super::calendar_config::CalendarConfig;
use crate::calendar::CalendarRef;
use crate::error::{CalvergeError, CalvergeResult};
use crate::event::{Event, EventHandle, EventSnapshot, EventTime, SyncedEventDraft};
use crate::ics::{generate_ics, parse_event};
use crate::sync_window::SyncWindow;

const MAX_SLUG_SUFFIX: usize = 100;

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn calendar_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    fn load_calendar(&self, path: &Path) -> Option<CalendarRef> {
        let id = path.file_name()?.to_str()?;
        if id.starts_with('.') {
            return None;
        }

        let config = match CalendarConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Skipping calendar '{}': {}", id, e);
                return None;
            }
        };

        Some(CalendarRef::new(
            id,
            config.name.clone().unwrap_or_else(|| id.to_string()),
            !config.read_only,
            config.source_title(),
        ))
    }

    /// Parsed events of one calendar directory, with their file paths
    fn read_events(&self, calendar_id: &str) -> CalvergeResult<Vec<(PathBuf, Event)>> {
        let dir = self.calendar_dir(calendar_id);
        let entries = std::fs::read_dir(&dir)?;

        let events = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|e| e == "ics"))
            .filter_map(|path| match read_event_file(&path) {
                Ok(event) => Some((path, event)),
                Err(e) => {
                    tracing::warn!("Skipping event file {}: {}", path.display(), e);
                    None
                }
            })
            .collect();

        Ok(events)
    }

    /// Pick a file name that doesn't collide with existing events.
    /// If the base slug exists, tries slug-2, slug-3, etc.
    fn unique_path_for(&self, dir: &Path, event: &Event) -> CalvergeResult<PathBuf> {
        let base = base_slug_for(event);

        let candidate = dir.join(format!("{}.ics", base));
        if !candidate.exists() {
            return Ok(candidate);
        }

        for n in 2..=MAX_SLUG_SUFFIX {
            let candidate = dir.join(format!("{}-{}.ics", base, n));
            if !candidate.exists() {
                return Ok(candidate);
            }
        }

        Err(CalvergeError::Store(format!(
            "Too many event name collisions for '{}'",
            base
        )))
    }
}

fn read_event_file(path: &Path) -> CalvergeResult<Event> {
    let content = std::fs::read_to_string(path)?;
    parse_event(&content)
}

/// Generate the base file name for an event.
/// Timed events: `YYYY-MM-DDTHHMM__slug`
/// All-day events: `YYYY-MM-DD__slug`
/// Recurring events: `_recurring__slug`
fn base_slug_for(event: &Event) -> String {
    let slug = event
        .summary
        .as_deref()
        .map(slug::slugify)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "event".to_string());

    if event.recurrence.is_some() {
        return format!("_recurring__{}", slug);
    }

    let date = match &event.start {
        EventTime::Date(d) => d.format("%Y-%m-%d").to_string(),
        EventTime::DateTimeUtc(dt) => dt.format("%Y-%m-%dT%H%M").to_string(),
        EventTime::DateTimeFloating(dt) => dt.format("%Y-%m-%dT%H%M").to_string(),
        EventTime::DateTimeZoned { datetime, .. } => datetime.format("%Y-%m-%dT%H%M").to_string(),
    };

    format!("{}__{}", date, slug)
}

fn to_snapshot(calendar_id: &str, path: &Path, event: Event) -> Option<EventSnapshot> {
    let Some(start) = event.start.to_utc() else {
        tracing::warn!("Skipping event with unresolvable start time: {}", path.display());
        return None;
    };
    let end = event.end.to_utc().unwrap_or(start);

    Some(EventSnapshot {
        handle: EventHandle::new(path.to_string_lossy()),
        event_id: Some(event.uid),
        calendar_id: calendar_id.to_string(),
        title: event.summary,
        location: event.location,
        notes: event.description,
        start,
        end,
        all_day: event.start.is_date(),
        recurrence: event.recurrence,
        alarms: event.reminders,
    })
}

fn to_event(draft: &SyncedEventDraft) -> Event {
    Event {
        uid: format!("{}@calverge", Uuid::new_v4()),
        summary: draft.title.clone(),
        description: Some(draft.notes.clone()),
        location: draft.location.clone(),
        start: EventTime::from_instant(draft.start, draft.all_day),
        end: EventTime::from_instant(draft.end, draft.all_day),
        recurrence: draft.recurrence.clone(),
        reminders: draft.alarms.clone(),
    }
}

#[async_trait]
impl CalendarStore for LocalStore {
    async fn request_access(&self) -> CalvergeResult<bool> {
        match std::fs::read_dir(&self.root) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Ok(false),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CalvergeError::Store(
                format!("Calendar directory not found at {}", self.root.display()),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn calendars(&self) -> CalvergeResult<Vec<CalendarRef>> {
        let entries = std::fs::read_dir(&self.root)?;

        let mut calendars: Vec<CalendarRef> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .filter_map(|path| self.load_calendar(&path))
            .collect();

        calendars.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(calendars)
    }

    async fn events(
        &self,
        calendars: &[CalendarRef],
        window: &SyncWindow,
    ) -> CalvergeResult<Vec<EventSnapshot>> {
        let mut snapshots = Vec::new();

        for calendar in calendars {
            for (path, event) in self.read_events(&calendar.id)? {
                if let Some(snapshot) = to_snapshot(&calendar.id, &path, event) {
                    if window.contains(snapshot.start) {
                        snapshots.push(snapshot);
                    }
                }
            }
        }

        snapshots.sort_by_key(|s| s.start);
        Ok(snapshots)
    }

    async fn create_event(&self, draft: &SyncedEventDraft) -> CalvergeResult<()> {
        let dir = self.calendar_dir(&draft.calendar_id);
        if !dir.is_dir() {
            return Err(CalvergeError::CalendarNotFound(draft.calendar_id.clone()));
        }

        let event = to_event(draft);
        let path = self.unique_path_for(&dir, &event)?;
        let content = generate_ics(&event);

        std::fs::write(&path, content)?;
        tracing::debug!("Created {}", path.display());

        Ok(())
    }

    async fn delete_event(&self, handle: &EventHandle) -> CalvergeResult<()> {
        let path = Path::new(handle.as_str());

        if !path.starts_with(&self.root) {
            return Err(CalvergeError::Store(format!(
                "Refusing to delete {} outside {}",
                path.display(),
                self.root.display()
            )));
        }

        std::fs::remove_file(path)?;
        tracing::debug!("Deleted {}", path.display());

        Ok(())
    }
}
