//! Note monitor core logic.
//!
//! This crate provides the monitoring engine:
//! - Timezone-aware daily execution schedule
//! - Daily note report with composable sections
//! - Liquidation candidate sweep with on-chain re-validation
//! - Tick-driven poll driver with jittered reconnect backoff
//!
//! Collaborators (chain reads, candidate search, reports, notifications,
//! tick sources) are traits so the engine can run against test doubles.

mod adapters;
pub mod config;
mod daily_check;
mod driver;
mod error;
mod liquidation;
mod reconnect;
pub mod report;
mod schedule;
mod traits;
pub mod u256_math;

#[cfg(test)]
mod testing;

pub use adapters::{BlockTickSource, IntervalTickSource};
pub use config::{
    parse_note_ids, DriverConfig, EnvSettings, LiquidationConfig, LiquidationThresholds, MonitorConfig,
    ScheduleConfig, TickMode,
};
pub use daily_check::DailyCheckProcessor;
pub use driver::{DriverSettings, DriverStatus, PollDriver, TickProcessor};
pub use error::{MonitorError, TickSourceError};
pub use liquidation::{select_candidates, LiquidationCandidate, LiquidationMonitor};
pub use reconnect::{BackoffPolicy, ConnectionState, ReconnectController};
pub use report::{MessageSection, NoteReportBuilder};
pub use schedule::ExecutionSchedule;
pub use traits::{CandidateSearch, ChainReader, Notifier, ReportBuilder, Tick, TickSource, TickStream};
