pub mod calendars;
pub mod status;
pub mod sync;
