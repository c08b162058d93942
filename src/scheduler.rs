//! Daily wall-clock trigger
//!
//! Polls the time source on a short fixed interval and fires the
//! reconciliation cycle when the current `HH:MM` equals the configured
//! execution time. A whole-minute watermark records the last firing, so the
//! cycle runs once per matching minute rather than once per poll tick, and a
//! local-clock fallback tick cannot double-fire after network time resumes.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::timesync::{SystemClock, TimeSource, WallClock};
use crate::Result;

/// One reconciliation-and-delivery cycle, run by the scheduler on trigger.
#[async_trait]
pub trait CycleRunner: Send {
    async fn run_cycle(&mut self, date: NaiveDate) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Watermark {
    date: NaiveDate,
    minute: String,
}

/// Daily gate over a time source with a local-clock fallback.
pub struct Scheduler<T: TimeSource> {
    execution_time: String,
    poll_interval: Duration,
    time_source: Option<T>,
    fallback: SystemClock,
    last_fired: Option<Watermark>,
}

impl<T: TimeSource> Scheduler<T> {
    /// `execution_time` is the pre-validated "HH:MM" trigger minute; with no
    /// `time_source` the local clock alone drives the schedule.
    pub fn new(execution_time: String, poll_interval: Duration, time_source: Option<T>) -> Self {
        Self {
            execution_time,
            poll_interval,
            time_source,
            fallback: SystemClock,
            last_fired: None,
        }
    }

    /// Whether this clock reading should trigger a cycle, advancing the
    /// watermark when it does.
    fn should_fire(&mut self, clock: &WallClock) -> bool {
        let minute = clock.minute();
        if minute != self.execution_time {
            return false;
        }

        let watermark = Watermark {
            date: clock.date,
            minute,
        };
        if self.last_fired.as_ref() == Some(&watermark) {
            return false;
        }

        self.last_fired = Some(watermark);
        true
    }

    async fn read_clock(&self) -> WallClock {
        match &self.time_source {
            Some(source) => match source.now().await {
                Ok(clock) => clock,
                Err(e) => {
                    warn!("time source unavailable, falling back to local clock: {e}");
                    self.fallback.read()
                }
            },
            None => self.fallback.read(),
        }
    }

    /// Run forever, invoking `runner` once per matching minute.
    pub async fn run<R: CycleRunner>(mut self, mut runner: R) {
        info!(
            "Scheduler started (execution time {}, poll interval {:?})",
            self.execution_time, self.poll_interval
        );

        let mut timer = interval(self.poll_interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            timer.tick().await;

            let clock = self.read_clock().await;
            if self.should_fire(&clock) {
                info!(date = %clock.date, "execution time reached, starting reconciliation cycle");
                if let Err(e) = runner.run_cycle(clock.date).await {
                    error!(date = %clock.date, "reconciliation cycle failed: {e}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn clock(day: u32, hour: u32, minute: u32, second: u32) -> WallClock {
        WallClock {
            date: NaiveDate::from_ymd_opt(2026, 8, day).unwrap(),
            time: NaiveTime::from_hms_opt(hour, minute, second).unwrap(),
        }
    }

    fn scheduler(execution_time: &str) -> Scheduler<SystemClock> {
        Scheduler::new(execution_time.to_string(), Duration::from_secs(10), None)
    }

    #[test]
    fn fires_once_per_matching_minute() {
        let mut s = scheduler("17:10");

        assert!(!s.should_fire(&clock(6, 17, 9, 55)));
        assert!(s.should_fire(&clock(6, 17, 10, 2)));
        // Subsequent poll ticks inside the same minute stay quiet.
        assert!(!s.should_fire(&clock(6, 17, 10, 12)));
        assert!(!s.should_fire(&clock(6, 17, 10, 42)));
        assert!(!s.should_fire(&clock(6, 17, 11, 2)));
    }

    #[test]
    fn refires_on_the_next_day() {
        let mut s = scheduler("17:10");

        assert!(s.should_fire(&clock(6, 17, 10, 0)));
        assert!(s.should_fire(&clock(7, 17, 10, 0)));
    }

    #[test]
    fn fallback_reading_in_the_same_minute_does_not_double_fire() {
        let mut s = scheduler("17:10");

        // Network time fired the cycle; a later tick served by the local
        // clock lands in the same minute.
        assert!(s.should_fire(&clock(6, 17, 10, 3)));
        assert!(!s.should_fire(&clock(6, 17, 10, 31)));
    }

    #[test]
    fn non_matching_minutes_never_advance_the_watermark() {
        let mut s = scheduler("17:10");

        assert!(!s.should_fire(&clock(6, 9, 0, 0)));
        assert!(s.last_fired.is_none());
    }
}
