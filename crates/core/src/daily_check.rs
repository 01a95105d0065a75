//! Daily report trigger for the primary note.

use crate::schedule::ExecutionSchedule;
use crate::traits::ReportBuilder;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info};

/// Runs the note report once per scheduled day.
pub struct DailyCheckProcessor {
    schedule: ExecutionSchedule,
    builder: Arc<dyn ReportBuilder>,
    primary_note: String,
}

impl DailyCheckProcessor {
    pub fn new(schedule: ExecutionSchedule, builder: Arc<dyn ReportBuilder>, primary_note: impl Into<String>) -> Self {
        Self {
            schedule,
            builder,
            primary_note: primary_note.into(),
        }
    }

    /// Report messages if the schedule triggers at `now`, else nothing.
    pub async fn check_and_run(&mut self, now: DateTime<Utc>) -> Vec<String> {
        if !self.schedule.should_trigger(now) {
            return Vec::new();
        }

        info!(local_time = %self.schedule.describe(now), "Daily check triggered");
        self.run_now(now).await
    }

    /// Run the report unconditionally and mark the day executed.
    ///
    /// The day is marked even when the report fails, so a broken
    /// collaborator yields one error message per day rather than one per tick.
    pub async fn run_now(&mut self, now: DateTime<Utc>) -> Vec<String> {
        info!(note_id = %self.primary_note, "Running daily note check");

        let message = match self.builder.build(&self.primary_note, true).await {
            Ok(report) => {
                info!(note_id = %self.primary_note, "Daily note check completed");
                report
            }
            Err(e) => {
                error!(note_id = %self.primary_note, error = %e, "Daily note check failed");
                format!("Error checking note: {e}")
            }
        };

        self.schedule.mark_executed(now);
        vec![message]
    }

    pub fn schedule(&self) -> &ExecutionSchedule {
        &self.schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockReportBuilder;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn processor(builder: Arc<MockReportBuilder>) -> DailyCheckProcessor {
        let schedule = ExecutionSchedule::new(chrono_tz::America::Chicago, 5, 0).unwrap();
        DailyCheckProcessor::new(schedule, builder, "42")
    }

    #[tokio::test]
    async fn test_no_trigger_returns_nothing() {
        let builder = Arc::new(MockReportBuilder::ok("report"));
        let mut daily = processor(builder.clone());

        // 04:00 CST
        assert!(daily.check_and_run(utc("2024-01-15T10:00:00Z")).await.is_empty());
        assert_eq!(builder.calls(), Vec::<(String, bool)>::new());
    }

    #[tokio::test]
    async fn test_trigger_builds_primary_note_with_claim() {
        let builder = Arc::new(MockReportBuilder::ok("Note: 42"));
        let mut daily = processor(builder.clone());

        let now = utc("2024-01-15T12:00:00Z");
        assert_eq!(daily.check_and_run(now).await, vec!["Note: 42".to_string()]);
        assert_eq!(builder.calls(), vec![("42".to_string(), true)]);

        // Same day again
        assert!(daily.check_and_run(utc("2024-01-15T20:00:00Z")).await.is_empty());
    }

    #[tokio::test]
    async fn test_failure_becomes_message_and_marks_day() {
        let builder = Arc::new(MockReportBuilder::failing("rpc down"));
        let mut daily = processor(builder.clone());

        let now = utc("2024-01-15T12:00:00Z");
        let messages = daily.check_and_run(now).await;
        assert_eq!(messages, vec!["Error checking note: rpc down".to_string()]);
        assert!(!daily.schedule().should_trigger(utc("2024-01-15T13:00:00Z")));
    }

    #[tokio::test]
    async fn test_run_now_ignores_target_time() {
        let builder = Arc::new(MockReportBuilder::ok("report"));
        let mut daily = processor(builder.clone());

        // 01:00 CST, before target
        let startup = utc("2024-01-15T07:00:00Z");
        assert_eq!(daily.run_now(startup).await.len(), 1);
        // Already marked for the day
        assert!(daily.check_and_run(utc("2024-01-15T12:00:00Z")).await.is_empty());
    }
}
