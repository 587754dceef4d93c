//! In-memory store for exercising the sync engine in tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::CalendarStore;
use crate::calendar::CalendarRef;
use crate::error::{CalvergeError, CalvergeResult};
use crate::event::{EventHandle, EventSnapshot, SyncedEventDraft};
use crate::sync_window::SyncWindow;

#[derive(Default)]
pub(crate) struct MemoryStore {
    calendars: Vec<CalendarRef>,
    events: Mutex<Vec<EventSnapshot>>,
    next_handle: AtomicUsize,
    access_denied: bool,
    access_delay: Option<Duration>,
    ignore_window: bool,
    fail_create_titles: HashSet<String>,
    fail_delete_titles: HashSet<String>,
    fail_query_calendars: HashSet<String>,
    pub queries: AtomicUsize,
    pub mutations: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_calendar(mut self, id: &str, writable: bool) -> Self {
        let title = format!("{id} calendar");
        self.calendars
            .push(CalendarRef::new(id, title, writable, "Memory"));
        self
    }

    pub fn deny_access(mut self) -> Self {
        self.access_denied = true;
        self
    }

    pub fn delay_access(mut self, delay: Duration) -> Self {
        self.access_delay = Some(delay);
        self
    }

    /// Return every event of the queried calendars, in or out of the window.
    pub fn ignore_window(mut self) -> Self {
        self.ignore_window = true;
        self
    }

    pub fn fail_create(mut self, title: &str) -> Self {
        self.fail_create_titles.insert(title.to_string());
        self
    }

    pub fn fail_delete(mut self, title: &str) -> Self {
        self.fail_delete_titles.insert(title.to_string());
        self
    }

    /// Make every event query touching `calendar_id` fail.
    pub fn fail_query(mut self, calendar_id: &str) -> Self {
        self.fail_query_calendars.insert(calendar_id.to_string());
        self
    }

    pub fn calendar_ref(&self, id: &str) -> CalendarRef {
        self.calendars
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .unwrap_or_else(|| panic!("no calendar '{id}' in test store"))
    }

    /// Insert a plain event; returns its handle.
    pub fn add_event(
        &self,
        calendar_id: &str,
        title: &str,
        start: DateTime<Utc>,
        notes: Option<&str>,
    ) -> EventHandle {
        let handle = self.next_handle();
        let snapshot = EventSnapshot {
            handle: handle.clone(),
            event_id: Some(format!("evt-{}", handle)),
            calendar_id: calendar_id.to_string(),
            title: Some(title.to_string()),
            location: None,
            notes: notes.map(str::to_string),
            start,
            end: start + chrono::Duration::hours(1),
            all_day: false,
            recurrence: None,
            alarms: vec![],
        };
        self.insert(snapshot);
        handle
    }

    pub fn insert(&self, snapshot: EventSnapshot) {
        self.events.lock().unwrap().push(snapshot);
    }

    pub fn events_in(&self, calendar_id: &str) -> Vec<EventSnapshot> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.calendar_id == calendar_id)
            .cloned()
            .collect()
    }

    fn next_handle(&self) -> EventHandle {
        let n = self.next_handle.fetch_add(1, Ordering::SeqCst);
        EventHandle::new(format!("mem-{n}"))
    }
}

#[async_trait]
impl CalendarStore for MemoryStore {
    async fn request_access(&self) -> CalvergeResult<bool> {
        if let Some(delay) = self.access_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(!self.access_denied)
    }

    async fn calendars(&self) -> CalvergeResult<Vec<CalendarRef>> {
        Ok(self.calendars.clone())
    }

    async fn events(
        &self,
        calendars: &[CalendarRef],
        window: &SyncWindow,
    ) -> CalvergeResult<Vec<EventSnapshot>> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        if calendars
            .iter()
            .any(|c| self.fail_query_calendars.contains(&c.id))
        {
            return Err(CalvergeError::Store("simulated query failure".into()));
        }

        let mut events: Vec<EventSnapshot> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| calendars.iter().any(|c| c.id == e.calendar_id))
            .filter(|e| self.ignore_window || window.contains(e.start))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start);

        Ok(events)
    }

    async fn create_event(&self, draft: &SyncedEventDraft) -> CalvergeResult<()> {
        self.mutations.fetch_add(1, Ordering::SeqCst);

        if self.fail_create_titles.contains(draft.display_title()) {
            return Err(CalvergeError::Store("simulated save failure".into()));
        }

        let handle = self.next_handle();
        self.insert(EventSnapshot {
            handle: handle.clone(),
            event_id: Some(format!("evt-{}", handle)),
            calendar_id: draft.calendar_id.clone(),
            title: draft.title.clone(),
            location: draft.location.clone(),
            notes: Some(draft.notes.clone()),
            start: draft.start,
            end: draft.end,
            all_day: draft.all_day,
            recurrence: draft.recurrence.clone(),
            alarms: draft.alarms.clone(),
        });

        Ok(())
    }

    async fn delete_event(&self, handle: &EventHandle) -> CalvergeResult<()> {
        self.mutations.fetch_add(1, Ordering::SeqCst);

        let mut events = self.events.lock().unwrap();
        let index = events
            .iter()
            .position(|e| &e.handle == handle)
            .ok_or_else(|| CalvergeError::Store(format!("no event {handle}")))?;

        if self.fail_delete_titles.contains(events[index].display_title()) {
            return Err(CalvergeError::Store("simulated remove failure".into()));
        }

        events.remove(index);
        Ok(())
    }
}
