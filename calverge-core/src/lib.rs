//! Core of calverge: one-way mirroring of future events from source
//! calendars into a target calendar.
//!
//! Synced copies carry a provenance block in their notes, which is how later
//! runs recognize (and replace) them. The engine only talks to calendars
//! through the [`store::CalendarStore`] trait; [`store::LocalStore`] keeps
//! calendars as directories of `.ics` files.

pub mod calendar;
pub mod config;
pub mod error;
pub mod event;
pub mod ics;
pub mod orchestrator;
pub mod provenance;
pub mod reconcile;
pub mod store;
pub mod sync_config;
pub mod sync_window;
