//! Calendar store abstraction.
//!
//! The sync engine never touches storage directly: everything goes through a
//! `CalendarStore` passed in by the caller. `LocalStore` keeps calendars as
//! directories of .ics files.

mod calendar_config;
mod local;
#[cfg(test)]
pub(crate) mod memory;

pub use calendar_config::CalendarConfig;
pub use local::LocalStore;

use async_trait::async_trait;

use crate::calendar::CalendarRef;
use crate::error::CalvergeResult;
use crate::event::{EventHandle, EventSnapshot, SyncedEventDraft};
use crate::sync_window::SyncWindow;

#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Ask for access to calendar data. May wait on the user or platform.
    async fn request_access(&self) -> CalvergeResult<bool>;

    /// All calendars, in a stable order.
    async fn calendars(&self) -> CalvergeResult<Vec<CalendarRef>>;

    /// Events in `calendars` whose start lies inside `window`.
    async fn events(
        &self,
        calendars: &[CalendarRef],
        window: &SyncWindow,
    ) -> CalvergeResult<Vec<EventSnapshot>>;

    async fn create_event(&self, draft: &SyncedEventDraft) -> CalvergeResult<()>;

    async fn delete_event(&self, handle: &EventHandle) -> CalvergeResult<()>;

    async fn calendar(&self, id: &str) -> CalvergeResult<Option<CalendarRef>> {
        let calendars = self.calendars().await?;
        Ok(calendars.into_iter().find(|c| c.id == id))
    }
}
