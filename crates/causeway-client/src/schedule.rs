//! Adaptive polling schedule.
//!
//! Polling tight at first and looser later keeps fast operations snappy
//! without hammering the relay for slow ones. The default schedule polls
//! every second for the first five polls, every two seconds for the next
//! five, then settles at three seconds.

use std::time::Duration;

/// Delay schedule over successive polls of one operation.
///
/// A schedule is a list of (count, delay) bands followed by a steady-state
/// delay once the bands are spent. Delays are pure functions of the poll
/// index, so a transient retry can re-use its slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSchedule {
    bands: Vec<(u32, Duration)>,
    steady: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            bands: vec![
                (5, Duration::from_secs(1)),
                (5, Duration::from_secs(2)),
            ],
            steady: Duration::from_secs(3),
        }
    }
}

impl PollSchedule {
    /// Creates a schedule from explicit bands and a steady-state delay.
    #[must_use]
    pub fn new(bands: Vec<(u32, Duration)>, steady: Duration) -> Self {
        Self { bands, steady }
    }

    /// Creates a schedule with a single fixed delay (primarily tests).
    #[must_use]
    pub fn fixed(delay: Duration) -> Self {
        Self {
            bands: Vec::new(),
            steady: delay,
        }
    }

    /// The delay before poll number `poll_index` (zero-based).
    #[must_use]
    pub fn delay_for(&self, poll_index: u32) -> Duration {
        let mut remaining = poll_index;
        for (count, delay) in &self.bands {
            if remaining < *count {
                return *delay;
            }
            remaining -= count;
        }
        self.steady
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_bands() {
        let schedule = PollSchedule::default();
        for index in 0..5 {
            assert_eq!(schedule.delay_for(index), Duration::from_secs(1));
        }
        for index in 5..10 {
            assert_eq!(schedule.delay_for(index), Duration::from_secs(2));
        }
        assert_eq!(schedule.delay_for(10), Duration::from_secs(3));
        assert_eq!(schedule.delay_for(100), Duration::from_secs(3));
    }

    #[test]
    fn fixed_schedule_never_varies() {
        let schedule = PollSchedule::fixed(Duration::from_millis(50));
        assert_eq!(schedule.delay_for(0), Duration::from_millis(50));
        assert_eq!(schedule.delay_for(999), Duration::from_millis(50));
    }

    #[test]
    fn delay_is_pure_in_poll_index() {
        let schedule = PollSchedule::default();
        assert_eq!(schedule.delay_for(4), schedule.delay_for(4));
        assert_eq!(schedule.delay_for(7), schedule.delay_for(7));
    }
}
