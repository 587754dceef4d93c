//! The future-only time window a sync run operates on.

use chrono::{DateTime, Months, Utc};

/// Length of the window, in calendar months
const SYNC_WINDOW_MONTHS: u32 = 12;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    /// `[now, now + 1 year)`
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        let end = now
            .checked_add_months(Months::new(SYNC_WINDOW_MONTHS))
            .unwrap_or(now);

        SyncWindow { start: now, end }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}
