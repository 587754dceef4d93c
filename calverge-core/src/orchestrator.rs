//! Drives reconciliation across all configured sources.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::calendar::CalendarRef;
use crate::error::{CalvergeError, CalvergeResult};
use crate::provenance::ProvenanceTag;
use crate::reconcile::{EventFailure, Reconciler};
use crate::store::CalendarStore;
use crate::sync_config::{SyncConfiguration, SyncMode};
use crate::sync_window::SyncWindow;

/// Per-source line of a sync report.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReport {
    pub calendar: CalendarRef,
    pub synced: usize,
    pub cleaned: usize,
    pub failures: Vec<EventFailure>,
    /// Set when the source could not be reconciled at all; the run moved on
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub config_name: String,
    pub mode: SyncMode,
    pub target: CalendarRef,
    pub sources: Vec<SourceReport>,
    /// Configured source ids that did not resolve (or were unusable)
    pub skipped_sources: Vec<String>,
    pub total_synced: usize,
    pub total_cleaned: usize,
    /// Set when the run stopped early; completed sources are still valid
    pub cancelled: bool,
}

impl SyncReport {
    pub fn failures(&self) -> impl Iterator<Item = &EventFailure> {
        self.sources.iter().flat_map(|s| &s.failures)
    }
}

/// What a sync would do for one source, without doing it.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceStatus {
    pub calendar: CalendarRef,
    /// Future artifacts of this source currently in the target
    pub synced_artifacts: usize,
    /// Future source events a sync would copy
    pub pending_events: usize,
    /// Most recent provenance tag among the artifacts, if any
    pub last_sync: Option<ProvenanceTag>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub config_name: String,
    pub mode: SyncMode,
    pub target: CalendarRef,
    pub sources: Vec<SourceStatus>,
    pub skipped_sources: Vec<String>,
}

/// Calendars a configuration resolves to.
struct Resolved {
    target: CalendarRef,
    sources: Vec<CalendarRef>,
    skipped: Vec<String>,
}

pub struct Orchestrator<'a, S: CalendarStore + ?Sized> {
    store: &'a S,
    access_timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl<'a, S: CalendarStore + ?Sized> Orchestrator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Orchestrator {
            store,
            access_timeout: None,
            cancel: None,
        }
    }

    /// Bound the wait for the store's access grant.
    pub fn with_access_timeout(mut self, timeout: Duration) -> Self {
        self.access_timeout = Some(timeout);
        self
    }

    /// Checked before each source; remaining sources are skipped once cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub async fn run_sync(&self, config: &SyncConfiguration) -> CalvergeResult<SyncReport> {
        self.run_sync_at(config, Utc::now()).await
    }

    pub async fn run_sync_at(
        &self,
        config: &SyncConfiguration,
        now: DateTime<Utc>,
    ) -> CalvergeResult<SyncReport> {
        let resolved = self.resolve(config).await?;

        tracing::info!(
            config = config.display_name(),
            mode = %config.sync_mode,
            target = %resolved.target.id,
            sources = resolved.sources.len(),
            "Starting sync"
        );

        let reconciler = Reconciler::new(self.store);
        let mut report = SyncReport {
            config_name: config.display_name().to_string(),
            mode: config.sync_mode,
            target: resolved.target.clone(),
            sources: Vec::with_capacity(resolved.sources.len()),
            skipped_sources: resolved.skipped,
            total_synced: 0,
            total_cleaned: 0,
            cancelled: false,
        };

        for source in &resolved.sources {
            if self.is_cancelled() {
                tracing::warn!(source = %source.id, "Sync cancelled, skipping remaining sources");
                report.cancelled = true;
                break;
            }

            let outcome = match reconciler
                .sync(source, &resolved.target, config, now)
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(source = %source.id, "Failed to reconcile source: {}", e);
                    report.sources.push(SourceReport {
                        calendar: source.clone(),
                        synced: 0,
                        cleaned: 0,
                        failures: Vec::new(),
                        error: Some(e.to_string()),
                    });
                    continue;
                }
            };

            report.total_synced += outcome.synced;
            report.total_cleaned += outcome.cleaned;
            report.sources.push(SourceReport {
                calendar: source.clone(),
                synced: outcome.synced,
                cleaned: outcome.cleaned,
                failures: outcome.failures,
                error: None,
            });
        }

        Ok(report)
    }

    /// Calendars the store exposes, once access is granted.
    pub async fn calendars(&self) -> CalvergeResult<Vec<CalendarRef>> {
        self.request_access().await?;
        self.store.calendars().await
    }

    /// Read-only preview of a sync run.
    pub async fn status(&self, config: &SyncConfiguration) -> CalvergeResult<StatusReport> {
        self.status_at(config, Utc::now()).await
    }

    pub async fn status_at(
        &self,
        config: &SyncConfiguration,
        now: DateTime<Utc>,
    ) -> CalvergeResult<StatusReport> {
        let resolved = self.resolve(config).await?;
        let window = SyncWindow::starting_at(now);
        let reconciler = Reconciler::new(self.store);

        let mut sources = Vec::with_capacity(resolved.sources.len());
        for source in &resolved.sources {
            let artifacts = reconciler
                .stale_artifacts(source, &resolved.target, &window)
                .await?;
            let last_sync = artifacts
                .iter()
                .filter_map(|e| e.notes.as_deref().and_then(ProvenanceTag::decode))
                .max_by_key(|tag| tag.synced_at);
            let pending_events = self
                .store
                .events(std::slice::from_ref(source), &window)
                .await?
                .iter()
                .filter(|e| window.contains(e.start))
                .count();

            sources.push(SourceStatus {
                calendar: source.clone(),
                synced_artifacts: artifacts.len(),
                pending_events,
                last_sync,
            });
        }

        Ok(StatusReport {
            config_name: config.display_name().to_string(),
            mode: config.sync_mode,
            target: resolved.target,
            sources,
            skipped_sources: resolved.skipped,
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    async fn request_access(&self) -> CalvergeResult<()> {
        let granted = match self.access_timeout {
            Some(limit) => tokio::time::timeout(limit, self.store.request_access())
                .await
                .map_err(|_| CalvergeError::AccessTimeout(limit))??,
            None => self.store.request_access().await?,
        };

        if granted {
            Ok(())
        } else {
            Err(CalvergeError::PermissionDenied)
        }
    }

    /// Access check, then target and source resolution. No event is queried
    /// or touched before this succeeds.
    async fn resolve(&self, config: &SyncConfiguration) -> CalvergeResult<Resolved> {
        self.request_access().await?;

        let calendars = self.store.calendars().await?;
        let find = |id: &str| calendars.iter().find(|c| c.id == id).cloned();

        let target = find(&config.target_calendar_id)
            .ok_or_else(|| CalvergeError::CalendarNotFound(config.target_calendar_id.clone()))?;

        if !target.writable {
            return Err(CalvergeError::CalendarReadOnly(target.title));
        }

        let mut sources: Vec<CalendarRef> = Vec::new();
        let mut skipped = Vec::new();

        for id in &config.source_calendar_ids {
            let id = id.trim();
            if id.is_empty() {
                continue;
            }

            if id == target.id {
                tracing::warn!("Source calendar is the target calendar, skipping: {}", id);
                skipped.push(id.to_string());
                continue;
            }

            if sources.iter().any(|c| c.id == id) {
                tracing::debug!("Duplicate source calendar ignored: {}", id);
                continue;
            }

            match find(id) {
                Some(calendar) => sources.push(calendar),
                None => {
                    tracing::warn!("Source calendar not found: {}", id);
                    skipped.push(id.to_string());
                }
            }
        }

        if sources.is_empty() {
            return Err(CalvergeError::NoValidSourceCalendars);
        }

        Ok(Resolved {
            target,
            sources,
            skipped,
        })
    }
}
