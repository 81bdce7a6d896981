/// Utility functions for timestamps and the wall clock
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Format a timestamp as YYYY-MM-DD HH:MM:SS
///
/// Falls back to the default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    dt.format(format).unwrap_or_else(|_| dt.to_string())
}

/// Wall clock pinned to the local UTC offset captured at start-up.
///
/// The offset has to be read before the runtime spawns any threads.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    offset: UtcOffset,
}

impl Clock {
    pub fn local() -> Self {
        Self {
            offset: UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        }
    }

    pub fn with_offset(offset: UtcOffset) -> Self {
        Self { offset }
    }

    pub fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }
}
