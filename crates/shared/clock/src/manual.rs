use bastion_core::Timestamp;
use bastion_ports::Clock;
use chrono::{DateTime, Duration};
use std::sync::atomic::{AtomicI64, Ordering};

/// Clock that only moves when told to
///
/// Time is held as nanoseconds since the epoch so reads and writes are
/// lock-free and callable from sync code.
#[derive(Debug)]
pub struct ManualClock {
    nanos: AtomicI64,
}

impl ManualClock {
    /// Clock frozen at `start`. Times outside chrono's nanosecond range
    /// (years 1677-2262) saturate.
    pub fn at(start: Timestamp) -> Self {
        Self {
            nanos: AtomicI64::new(to_nanos(start)),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, time: Timestamp) {
        self.nanos.store(to_nanos(time), Ordering::SeqCst);
    }

    /// Move forward (or backward for negative durations)
    pub fn advance(&self, by: Duration) {
        let delta = by.num_nanoseconds().unwrap_or(i64::MAX);
        let _ = self
            .nanos
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_add(delta)));
    }
}

fn to_nanos(time: Timestamp) -> i64 {
    time.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        DateTime::from_timestamp_nanos(self.nanos.load(Ordering::SeqCst))
    }

    fn name(&self) -> &str {
        "ManualClock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_manual_clock_only_moves_when_advanced() {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 1, 30, 0).unwrap();
        let clock = ManualClock::at(start);

        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::minutes(30));
        assert_eq!(clock.now(), start + Duration::minutes(30));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
