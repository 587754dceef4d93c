//! Error types for calverge.

use std::time::Duration;

use thiserror::Error;

/// Errors that abort a calverge operation.
///
/// Per-event save/remove failures are not represented here: they are
/// collected as [`EventFailure`](crate::reconcile::EventFailure) values and
/// reported alongside the counts.
#[derive(Error, Debug)]
pub enum CalvergeError {
    #[error("Calendar access denied")]
    PermissionDenied,

    #[error("Calendar access request timed out after {}ms", .0.as_millis())]
    AccessTimeout(Duration),

    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("Calendar '{0}' is read-only")]
    CalendarReadOnly(String),

    #[error("No valid source calendars found")]
    NoValidSourceCalendars,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for calverge operations.
pub type CalvergeResult<T> = Result<T, CalvergeError>;
