//! Configuration for the note monitor.
//!
//! This module provides:
//! - Runtime configuration (profiles, schedule, thresholds, driver timing)
//! - Process environment (endpoints, note ids, signing key)

mod env;
mod monitor;

pub use env::{parse_note_ids, EnvSettings};
pub use monitor::{
    DriverConfig, LiquidationConfig, LiquidationThresholds, MonitorConfig, ScheduleConfig,
    TickMode,
};
