//! Reconciliation of one source calendar into the target calendar.
//!
//! Each run is cleanup-then-copy: every future artifact previously created
//! from the source is removed, then every future source event is copied
//! again with a fresh provenance tag. Nothing is diffed, so a run never
//! leaves stale or duplicate artifacts behind, and running it twice gives the
//! same result.
//!
//! Only events starting at or after `now` are ever looked at. Per-event
//! failures are recorded and skipped; they never abort the run.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::calendar::CalendarRef;
use crate::error::{CalvergeError, CalvergeResult};
use crate::event::{EventSnapshot, SyncedEventDraft};
use crate::provenance::{self, ProvenanceTag};
use crate::store::CalendarStore;
use crate::sync_config::{SyncConfiguration, SyncMode};
use crate::sync_window::SyncWindow;

/// Title of every event created in busy-only mode
pub const BUSY_TITLE: &str = "Busy";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOperation {
    Save,
    Remove,
}

impl fmt::Display for EventOperation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventOperation::Save => write!(f, "save"),
            EventOperation::Remove => write!(f, "remove"),
        }
    }
}

/// A single event that could not be saved or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFailure {
    pub operation: EventOperation,
    pub title: String,
    pub reason: String,
}

impl fmt::Display for EventFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Failed to {} event '{}': {}",
            self.operation, self.title, self.reason
        )
    }
}

/// Result of reconciling one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceOutcome {
    pub synced: usize,
    pub cleaned: usize,
    pub failures: Vec<EventFailure>,
}

enum EventOutcome {
    Done,
    Failed(EventFailure),
}

impl SourceOutcome {
    fn record_cleanup(&mut self, outcome: EventOutcome) {
        match outcome {
            EventOutcome::Done => self.cleaned += 1,
            EventOutcome::Failed(failure) => self.failures.push(failure),
        }
    }

    fn record_copy(&mut self, outcome: EventOutcome) {
        match outcome {
            EventOutcome::Done => self.synced += 1,
            EventOutcome::Failed(failure) => self.failures.push(failure),
        }
    }
}

pub struct Reconciler<'a, S: CalendarStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: CalendarStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Reconciler { store }
    }

    /// Make the target's future window consistent with `source`.
    pub async fn sync(
        &self,
        source: &CalendarRef,
        target: &CalendarRef,
        config: &SyncConfiguration,
        now: DateTime<Utc>,
    ) -> CalvergeResult<SourceOutcome> {
        if !target.writable {
            return Err(CalvergeError::CalendarReadOnly(target.title.clone()));
        }

        let window = SyncWindow::starting_at(now);
        let mut outcome = SourceOutcome::default();

        for event in self.stale_artifacts(source, target, &window).await? {
            let result = self.remove(&event).await;
            outcome.record_cleanup(result);
        }

        let source_events = self
            .store
            .events(std::slice::from_ref(source), &window)
            .await?;

        // Stores may be lenient about the window; re-check before copying
        for event in source_events.iter().filter(|e| window.contains(e.start)) {
            let draft = build_draft(event, target, config, now);
            let result = self.save(&draft).await;
            outcome.record_copy(result);
        }

        tracing::debug!(
            source = %source.id,
            synced = outcome.synced,
            cleaned = outcome.cleaned,
            failed = outcome.failures.len(),
            "Reconciled source"
        );

        Ok(outcome)
    }

    /// Future target events tagged as artifacts of `source`.
    pub async fn stale_artifacts(
        &self,
        source: &CalendarRef,
        target: &CalendarRef,
        window: &SyncWindow,
    ) -> CalvergeResult<Vec<EventSnapshot>> {
        let target_events = self
            .store
            .events(std::slice::from_ref(target), window)
            .await?;

        Ok(target_events
            .into_iter()
            // Past events are never candidates, whatever their tag says
            .filter(|e| window.contains(e.start))
            .filter(|e| {
                e.notes
                    .as_deref()
                    .is_some_and(|notes| provenance::matches(notes, &source.id))
            })
            .collect())
    }

    async fn remove(&self, event: &EventSnapshot) -> EventOutcome {
        match self.store.delete_event(&event.handle).await {
            Ok(()) => EventOutcome::Done,
            Err(e) => {
                tracing::warn!("Failed to remove event '{}': {}", event.display_title(), e);
                EventOutcome::Failed(EventFailure {
                    operation: EventOperation::Remove,
                    title: event.display_title().to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn save(&self, draft: &SyncedEventDraft) -> EventOutcome {
        match self.store.create_event(draft).await {
            Ok(()) => EventOutcome::Done,
            Err(e) => {
                tracing::warn!("Failed to save event '{}': {}", draft.display_title(), e);
                EventOutcome::Failed(EventFailure {
                    operation: EventOperation::Save,
                    title: draft.display_title().to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Derive the target event for one source event.
pub fn build_draft(
    event: &EventSnapshot,
    target: &CalendarRef,
    config: &SyncConfiguration,
    now: DateTime<Utc>,
) -> SyncedEventDraft {
    let with_details = config.sync_mode == SyncMode::Full && config.include_details;

    let (title, location) = match config.sync_mode {
        SyncMode::Full => (event.title.clone(), event.location.clone()),
        SyncMode::BusyOnly => (Some(BUSY_TITLE.to_string()), None),
    };

    let (recurrence, alarms) = if with_details {
        (event.recurrence.clone(), event.alarms.clone())
    } else {
        (None, Vec::new())
    };

    let tag = ProvenanceTag::new(config, &event.calendar_id, event.event_id.as_deref(), now);
    let notes = provenance::append(event.notes.as_deref(), &tag.encode(), with_details);

    SyncedEventDraft {
        calendar_id: target.id.clone(),
        start: event.start,
        end: event.end,
        all_day: event.all_day,
        title,
        location,
        notes,
        recurrence,
        alarms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Recurrence, Reminder};
    use crate::store::memory::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 25, 9, 0, 0).unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_calendar("source", false)
            .with_calendar("other", false)
            .with_calendar("target", true)
    }

    fn config(mode: SyncMode, include_details: bool) -> SyncConfiguration {
        SyncConfiguration::new("target", vec!["source".into()])
            .with_mode(mode)
            .with_details(include_details)
    }

    fn detailed_event(store: &MemoryStore) {
        store.insert(EventSnapshot {
            handle: crate::event::EventHandle::new("detailed"),
            event_id: Some("orig-42".into()),
            calendar_id: "source".into(),
            title: Some("Design review".into()),
            location: Some("Room 4".into()),
            notes: Some("Bring mockups".into()),
            start: now() + Duration::days(2),
            end: now() + Duration::days(2) + Duration::hours(1),
            all_day: false,
            recurrence: Some(Recurrence {
                rrule: "FREQ=WEEKLY;BYDAY=MO".into(),
                exdates: vec![],
            }),
            alarms: vec![Reminder { minutes: 15 }],
        });
    }

    async fn run(store: &MemoryStore, config: &SyncConfiguration) -> SourceOutcome {
        Reconciler::new(store)
            .sync(
                &store.calendar_ref("source"),
                &store.calendar_ref("target"),
                config,
                now(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn copies_only_events_inside_the_window() {
        let store = store();
        store.add_event("source", "Tomorrow", now() + Duration::days(1), None);
        store.add_event("source", "Far future", now() + Duration::days(400), None);
        store.add_event("source", "Yesterday", now() - Duration::days(1), None);

        let outcome = run(&store, &config(SyncMode::Full, true)).await;

        assert_eq!(outcome.synced, 1);
        assert_eq!(outcome.cleaned, 0);
        let copies = store.events_in("target");
        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0].title.as_deref(), Some("Tomorrow"));
    }

    #[tokio::test]
    async fn removes_only_tagged_artifacts() {
        let store = store();
        let start = now() + Duration::days(3);
        let config = config(SyncMode::Full, false);

        let tag = ProvenanceTag::new(&config, "source", Some("orig-1"), now()).encode();
        store.add_event("target", "Synced copy", start, Some(&tag));
        store.add_event("target", "Manual", start, Some("Dentist"));

        let outcome = run(&store, &config).await;

        assert_eq!(outcome.cleaned, 1);
        assert_eq!(outcome.synced, 0);
        let remaining = store.events_in("target");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].title.as_deref(), Some("Manual"));
    }

    #[tokio::test]
    async fn past_artifacts_are_never_removed() {
        let store = store();
        let config = config(SyncMode::Full, false);
        let tag = ProvenanceTag::new(&config, "source", None, now()).encode();
        store.add_event("target", "Last week", now() - Duration::days(7), Some(&tag));

        let outcome = run(&store, &config).await;

        assert_eq!(outcome.cleaned, 0);
        assert_eq!(store.events_in("target").len(), 1);
    }

    #[tokio::test]
    async fn past_events_are_skipped_even_when_the_store_returns_them() {
        let store = store().ignore_window();
        let config = config(SyncMode::Full, false);
        let tag = ProvenanceTag::new(&config, "source", None, now()).encode();
        store.add_event("target", "Earlier today", now() - Duration::hours(1), Some(&tag));
        store.add_event("source", "Last month", now() - Duration::days(30), None);

        let outcome = run(&store, &config).await;

        assert_eq!(outcome, SourceOutcome::default());
        assert_eq!(store.events_in("target").len(), 1);
    }

    #[tokio::test]
    async fn cleanup_is_scoped_to_the_source() {
        let store = store();
        let config = config(SyncMode::Full, false);
        let other_tag = ProvenanceTag::new(&config, "other", None, now()).encode();
        store.add_event("target", "From other", now() + Duration::days(1), Some(&other_tag));

        let outcome = run(&store, &config).await;

        assert_eq!(outcome.cleaned, 0);
        assert_eq!(store.events_in("target").len(), 1);
    }

    #[tokio::test]
    async fn second_run_cleans_what_the_first_created() {
        let store = store();
        store.add_event("source", "A", now() + Duration::days(1), None);
        store.add_event("source", "B", now() + Duration::days(10), None);
        let config = config(SyncMode::Full, true);

        let first = run(&store, &config).await;
        let second = run(&store, &config).await;

        assert_eq!(first.synced, 2);
        assert_eq!(second.synced, first.synced);
        assert_eq!(second.cleaned, first.synced);
        assert_eq!(store.events_in("target").len(), 2);
    }

    #[tokio::test]
    async fn save_failure_is_recorded_and_skipped() {
        let store = store().fail_create("Broken");
        store.add_event("source", "Broken", now() + Duration::days(1), None);
        store.add_event("source", "Fine", now() + Duration::days(2), None);

        let outcome = run(&store, &config(SyncMode::Full, false)).await;

        assert_eq!(outcome.synced, 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].operation, EventOperation::Save);
        assert_eq!(outcome.failures[0].title, "Broken");
    }

    #[tokio::test]
    async fn remove_failure_is_recorded_and_skipped() {
        let store = store().fail_delete("Stuck");
        let config = config(SyncMode::Full, false);
        let tag = ProvenanceTag::new(&config, "source", None, now()).encode();
        store.add_event("target", "Stuck", now() + Duration::days(1), Some(&tag));
        store.add_event("target", "Loose", now() + Duration::days(2), Some(&tag));
        store.add_event("source", "New", now() + Duration::days(3), None);

        let outcome = run(&store, &config).await;

        assert_eq!(outcome.cleaned, 1);
        assert_eq!(outcome.synced, 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].operation, EventOperation::Remove);
        assert_eq!(
            outcome.failures[0].to_string(),
            "Failed to remove event 'Stuck': Store error: simulated remove failure"
        );
    }

    #[tokio::test]
    async fn read_only_target_is_rejected() {
        let store = store();
        let err = Reconciler::new(&store)
            .sync(
                &store.calendar_ref("source"),
                &store.calendar_ref("other"),
                &config(SyncMode::Full, false),
                now(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CalvergeError::CalendarReadOnly(_)));
    }

    #[tokio::test]
    async fn busy_only_hides_details() {
        for include_details in [false, true] {
            let store = store();
            detailed_event(&store);

            run(&store, &config(SyncMode::BusyOnly, include_details)).await;

            let copy = &store.events_in("target")[0];
            assert_eq!(copy.title.as_deref(), Some(BUSY_TITLE));
            assert_eq!(copy.location, None);
            assert_eq!(copy.recurrence, None);
            assert!(copy.alarms.is_empty());
            let notes = copy.notes.as_deref().unwrap();
            assert!(!notes.contains("Bring mockups"));
            assert!(notes.contains("Mode: busy-only"));
        }
    }

    #[tokio::test]
    async fn full_mode_without_details_copies_title_and_location_only() {
        let store = store();
        detailed_event(&store);

        run(&store, &config(SyncMode::Full, false)).await;

        let copy = &store.events_in("target")[0];
        assert_eq!(copy.title.as_deref(), Some("Design review"));
        assert_eq!(copy.location.as_deref(), Some("Room 4"));
        assert_eq!(copy.recurrence, None);
        assert!(copy.alarms.is_empty());
        assert!(!copy.notes.as_deref().unwrap().contains("Bring mockups"));
    }

    #[tokio::test]
    async fn full_mode_with_details_copies_everything() {
        let store = store();
        detailed_event(&store);

        run(&store, &config(SyncMode::Full, true)).await;

        let copy = &store.events_in("target")[0];
        assert_eq!(copy.recurrence.as_ref().unwrap().rrule, "FREQ=WEEKLY;BYDAY=MO");
        assert_eq!(copy.alarms, vec![Reminder { minutes: 15 }]);

        let notes = copy.notes.as_deref().unwrap();
        assert!(notes.starts_with("Bring mockups\n---\n"));
        assert!(provenance::matches(notes, "source"));

        let tag = ProvenanceTag::decode(notes).unwrap();
        assert_eq!(tag.original_id.as_deref(), Some("orig-42"));
        assert_eq!(tag.synced_at, now());
    }

    #[test]
    fn every_draft_gets_a_fresh_sync_id() {
        let store = store();
        detailed_event(&store);
        let event = &store.events_in("source")[0];
        let target = store.calendar_ref("target");
        let config = config(SyncMode::Full, false);

        let a = build_draft(event, &target, &config, now());
        let b = build_draft(event, &target, &config, now());

        let a_id = ProvenanceTag::decode(&a.notes).unwrap().sync_id;
        let b_id = ProvenanceTag::decode(&b.notes).unwrap().sync_id;
        assert_ne!(a_id, b_id);
        assert_eq!(a.calendar_id, "target");
        assert_eq!(a.start, event.start);
        assert_eq!(a.end, event.end);
    }
}
