/// Scheduled test message latch
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

use crate::config::TestSchedule;

/// Test messages go out during this window before the scheduled time.
pub const TEST_WINDOW: Duration = Duration::minutes(30);

#[derive(Debug, Clone)]
pub struct SelfTest {
    schedule: Option<TestSchedule>,
    sent: bool,
}

impl SelfTest {
    pub fn new(schedule: Option<TestSchedule>) -> Self {
        Self {
            schedule,
            sent: false,
        }
    }

    pub fn sent(&self) -> bool {
        self.sent
    }

    /// True exactly once per window. The latch re-arms as soon as `now`
    /// falls outside the window.
    pub fn due(&mut self, now: OffsetDateTime) -> bool {
        let Some(schedule) = self.schedule else {
            return false;
        };
        let now = PrimitiveDateTime::new(now.date(), now.time());
        if in_window(next_target(schedule, now), now) {
            if self.sent {
                return false;
            }
            self.sent = true;
            true
        } else {
            self.sent = false;
            false
        }
    }
}

fn next_target(schedule: TestSchedule, now: PrimitiveDateTime) -> PrimitiveDateTime {
    match schedule {
        TestSchedule::Once(at) => at,
        TestSchedule::Daily(time) => {
            let today = PrimitiveDateTime::new(now.date(), time);
            if today > now {
                today
            } else {
                today.checked_add(Duration::days(1)).unwrap_or(today)
            }
        }
    }
}

fn in_window(target: PrimitiveDateTime, now: PrimitiveDateTime) -> bool {
    let remaining = target - now;
    remaining > Duration::ZERO && remaining < TEST_WINDOW
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, time};

    #[test]
    fn fires_once_inside_window_and_rearms_after() {
        let mut test = SelfTest::new(Some(TestSchedule::Once(datetime!(2026-10-16 09:00:00))));
        assert!(!test.due(datetime!(2026-10-16 08:29:00 UTC)));
        assert!(test.due(datetime!(2026-10-16 08:31:00 UTC)));
        assert!(!test.due(datetime!(2026-10-16 08:45:00 UTC)));
        assert!(test.sent());
        assert!(!test.due(datetime!(2026-10-16 09:00:00 UTC)));
        assert!(!test.sent());
    }

    #[test]
    fn daily_schedule_recurs() {
        let mut test = SelfTest::new(Some(TestSchedule::Daily(time!(09:00:00))));
        assert!(test.due(datetime!(2026-10-16 08:45:00 UTC)));
        assert!(!test.due(datetime!(2026-10-16 08:50:00 UTC)));
        assert!(!test.due(datetime!(2026-10-16 12:00:00 UTC)));
        assert!(test.due(datetime!(2026-10-17 08:40:00 UTC)));
    }

    #[test]
    fn daily_window_spans_midnight() {
        let mut test = SelfTest::new(Some(TestSchedule::Daily(time!(00:10:00))));
        assert!(test.due(datetime!(2026-10-16 23:50:00 UTC)));
    }

    #[test]
    fn no_schedule_never_fires() {
        let mut test = SelfTest::new(None);
        assert!(!test.due(datetime!(2026-10-16 08:45:00 UTC)));
    }
}
