//! Once-per-day execution gate in a fixed IANA time zone.
//!
//! Wall-clock conversion uses the zone's offset at each instant, so the
//! gate stays correct across DST transitions.

use crate::config::ScheduleConfig;
use crate::error::MonitorError;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;

/// Daily trigger with a zone-local target time (inclusive).
#[derive(Debug, Clone)]
pub struct ExecutionSchedule {
    time_zone: Tz,
    target_hour: u32,
    target_minute: u32,
    /// Zone-local date of the last run; only moves forward
    last_execution_date: Option<NaiveDate>,
}

impl ExecutionSchedule {
    pub fn new(time_zone: Tz, target_hour: u32, target_minute: u32) -> Result<Self, MonitorError> {
        if target_hour > 23 || target_minute > 59 {
            return Err(MonitorError::InvalidTargetTime {
                hour: target_hour,
                minute: target_minute,
            });
        }

        Ok(Self {
            time_zone,
            target_hour,
            target_minute,
            last_execution_date: None,
        })
    }

    pub fn from_config(config: &ScheduleConfig) -> Result<Self, MonitorError> {
        Self::new(config.tz()?, config.target_hour, config.target_minute)
    }

    /// True when the local target time has passed today and today has not run.
    pub fn should_trigger(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.time_zone);
        let (hour, minute) = (local.hour(), local.minute());

        let is_after_target = hour > self.target_hour
            || (hour == self.target_hour && minute >= self.target_minute);
        let needs_run = self
            .last_execution_date
            .map_or(true, |last| last < local.date_naive());

        is_after_target && needs_run
    }

    /// Record a run on `now`'s local date. Never moves the date backwards.
    pub fn mark_executed(&mut self, now: DateTime<Utc>) {
        let today = self.local_date(now);
        self.last_execution_date = Some(self.last_execution_date.map_or(today, |last| last.max(today)));
    }

    pub fn last_execution_date(&self) -> Option<NaiveDate> {
        self.last_execution_date
    }

    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.time_zone).date_naive()
    }

    /// `now` rendered in the schedule's zone, for logs.
    pub fn describe(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.time_zone)
            .format("%Y-%m-%d %H:%M:%S %Z")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn chicago_at_five() -> ExecutionSchedule {
        ExecutionSchedule::new(chrono_tz::America::Chicago, 5, 0).unwrap()
    }

    #[test]
    fn test_rejects_invalid_target() {
        assert!(ExecutionSchedule::new(chrono_tz::UTC, 24, 0).is_err());
        assert!(ExecutionSchedule::new(chrono_tz::UTC, 5, 60).is_err());
    }

    #[test]
    fn test_before_target_does_not_trigger() {
        let schedule = chicago_at_five();
        // 04:59 CST
        assert!(!schedule.should_trigger(utc("2024-01-15T10:59:00Z")));
    }

    #[test]
    fn test_inclusive_at_exact_target() {
        let schedule = chicago_at_five();
        // 05:00:00 CST
        assert!(schedule.should_trigger(utc("2024-01-15T11:00:00Z")));
    }

    #[test]
    fn test_daily_cycle() {
        let mut schedule = chicago_at_five();

        // 06:00 local
        let first = utc("2024-01-15T12:00:00Z");
        assert!(schedule.should_trigger(first));
        schedule.mark_executed(first);

        // 23:00 local, same day
        assert!(!schedule.should_trigger(utc("2024-01-16T05:00:00Z")));
        // 00:30 next local day, before target
        assert!(!schedule.should_trigger(utc("2024-01-16T06:30:00Z")));
        // 05:00 next local day
        assert!(schedule.should_trigger(utc("2024-01-16T11:00:00Z")));
    }

    #[test]
    fn test_stays_false_until_local_date_advances() {
        let mut schedule = chicago_at_five();
        let run = utc("2024-06-01T10:30:00Z"); // 05:30 CDT
        schedule.mark_executed(run);

        // Up to 04:59Z on June 2nd it is still June 1st in Chicago
        for ts in ["2024-06-01T15:00:00Z", "2024-06-01T23:59:00Z", "2024-06-02T04:59:00Z"] {
            assert!(!schedule.should_trigger(utc(ts)), "{ts}");
        }
        // 05:00 CDT on the next local day
        assert!(schedule.should_trigger(utc("2024-06-02T10:00:00Z")));
    }

    #[test]
    fn test_spring_forward_triggers_once_per_day() {
        let mut schedule = chicago_at_five();

        // 2024-03-09 05:30 CST (UTC-6)
        let saturday = utc("2024-03-09T11:30:00Z");
        assert!(schedule.should_trigger(saturday));
        schedule.mark_executed(saturday);

        // 2024-03-10 04:30 CDT (UTC-5): a fixed -6h offset would read 03:30
        assert!(!schedule.should_trigger(utc("2024-03-10T09:30:00Z")));
        // 2024-03-10 05:30 CDT
        let sunday = utc("2024-03-10T10:30:00Z");
        assert!(schedule.should_trigger(sunday));
        schedule.mark_executed(sunday);

        assert!(!schedule.should_trigger(utc("2024-03-10T20:00:00Z")));
    }

    #[test]
    fn test_mark_executed_is_monotonic() {
        let mut schedule = chicago_at_five();
        schedule.mark_executed(utc("2024-01-16T12:00:00Z"));
        schedule.mark_executed(utc("2024-01-15T12:00:00Z"));
        assert_eq!(
            schedule.last_execution_date(),
            Some(NaiveDate::from_ymd_opt(2024, 1, 16).unwrap())
        );
    }

    #[test]
    fn test_describe_uses_zone() {
        let schedule = chicago_at_five();
        assert_eq!(schedule.describe(utc("2024-01-15T12:00:00Z")), "2024-01-15 06:00:00 CST");
    }
}
