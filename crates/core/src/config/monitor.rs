//! Runtime configuration with profile support.
//!
//! Every field has a serde default so a partial TOML file only overrides
//! what it names.

use crate::error::MonitorError;
use crate::reconnect::BackoffPolicy;
use crate::u256_math::parse_wad;
use alloy::primitives::U256;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Profile name (for logging/identification)
    #[serde(default = "default_profile_name")]
    pub profile: String,

    /// Daily report schedule
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Liquidation sweep thresholds
    #[serde(default)]
    pub liquidation: LiquidationConfig,

    /// Tick source, sweep throttle, watchdog and backoff timing
    #[serde(default)]
    pub driver: DriverConfig,
}

fn default_profile_name() -> String {
    "default".to_string()
}

/// Daily report schedule, in the zone's local time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// IANA zone name
    #[serde(default = "default_time_zone")]
    pub time_zone: String,

    #[serde(default = "default_target_hour")]
    pub target_hour: u32,

    #[serde(default)]
    pub target_minute: u32,

    /// Run the report on the first tick after start regardless of the time
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

fn default_time_zone() -> String {
    "America/Chicago".to_string()
}
fn default_target_hour() -> u32 {
    5
}
fn default_true() -> bool {
    true
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            time_zone: default_time_zone(),
            target_hour: default_target_hour(),
            target_minute: 0,
            run_on_startup: true,
        }
    }
}

impl ScheduleConfig {
    pub fn tz(&self) -> Result<Tz, MonitorError> {
        self.time_zone
            .parse()
            .map_err(|_| MonitorError::InvalidTimeZone(self.time_zone.clone()))
    }
}

/// Liquidation sweep thresholds as decimal strings (1e18-scaled when parsed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationConfig {
    /// Snapshot CR below which a note is re-checked on chain
    #[serde(default = "default_pre_filter_cr")]
    pub pre_filter_cr: String,

    /// Minimum debt (DYAD) for a note to be considered
    #[serde(default = "default_min_debt")]
    pub min_debt: String,

    /// On-chain CR below which an alert is emitted
    #[serde(default = "default_alert_cr")]
    pub alert_cr: String,
}

fn default_pre_filter_cr() -> String {
    "1.75".to_string()
}
fn default_min_debt() -> String {
    "100".to_string()
}
fn default_alert_cr() -> String {
    "1.5".to_string()
}

impl Default for LiquidationConfig {
    fn default() -> Self {
        Self {
            pre_filter_cr: default_pre_filter_cr(),
            min_debt: default_min_debt(),
            alert_cr: default_alert_cr(),
        }
    }
}

/// Parsed liquidation thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidationThresholds {
    pub pre_filter_cr: U256,
    pub min_debt: U256,
    pub alert_cr: U256,
}

impl LiquidationConfig {
    pub fn thresholds(&self) -> Result<LiquidationThresholds, MonitorError> {
        Ok(LiquidationThresholds {
            pre_filter_cr: parse_wad(&self.pre_filter_cr)?,
            min_debt: parse_wad(&self.min_debt)?,
            alert_cr: parse_wad(&self.alert_cr)?,
        })
    }
}

/// How ticks are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickMode {
    /// New-head WebSocket subscription
    Block,
    /// Fixed interval polling over HTTP
    Interval,
}

/// Driver timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default = "default_tick_mode")]
    pub tick_mode: TickMode,

    /// Polling period in interval mode (seconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Minimum time between liquidation sweeps (seconds)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Watchdog check period (seconds)
    #[serde(default = "default_watchdog_interval")]
    pub watchdog_interval_secs: u64,

    /// Silence after which the tick source is declared stalled (seconds)
    #[serde(default = "default_silence_window")]
    pub silence_window_secs: u64,

    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,

    /// Upper bound of the random extra delay, as a fraction of the delay
    #[serde(default = "default_backoff_jitter")]
    pub backoff_jitter: f64,

    /// Ticks buffered while the processor is busy; extra ticks are dropped
    #[serde(default = "default_tick_queue_capacity")]
    pub tick_queue_capacity: usize,
}

fn default_tick_mode() -> TickMode {
    TickMode::Block
}
fn default_poll_interval() -> u64 {
    12
}
fn default_sweep_interval() -> u64 {
    60
}
fn default_watchdog_interval() -> u64 {
    60
}
fn default_silence_window() -> u64 {
    300
}
fn default_backoff_base() -> u64 {
    1_000
}
fn default_backoff_max() -> u64 {
    60_000
}
fn default_backoff_jitter() -> f64 {
    0.25
}
fn default_tick_queue_capacity() -> usize {
    8
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_mode: default_tick_mode(),
            poll_interval_secs: default_poll_interval(),
            sweep_interval_secs: default_sweep_interval(),
            watchdog_interval_secs: default_watchdog_interval(),
            silence_window_secs: default_silence_window(),
            backoff_base_ms: default_backoff_base(),
            backoff_max_ms: default_backoff_max(),
            backoff_jitter: default_backoff_jitter(),
            tick_queue_capacity: default_tick_queue_capacity(),
        }
    }
}

impl DriverConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog_interval_secs)
    }
    pub fn silence_window(&self) -> Duration {
        Duration::from_secs(self.silence_window_secs)
    }

    /// Timer periods feed `tokio::time::interval`, which rejects zero.
    pub fn validate_intervals(&self) -> Result<(), MonitorError> {
        let periods = [
            ("poll_interval_secs", self.poll_interval_secs),
            ("watchdog_interval_secs", self.watchdog_interval_secs),
            ("silence_window_secs", self.silence_window_secs),
        ];
        match periods.into_iter().find(|&(_, secs)| secs == 0) {
            Some((name, _)) => Err(MonitorError::ZeroInterval(name)),
            None => Ok(()),
        }
    }

    pub fn backoff_policy(&self) -> Result<BackoffPolicy, MonitorError> {
        BackoffPolicy::new(
            Duration::from_millis(self.backoff_base_ms),
            Duration::from_millis(self.backoff_max_ms),
            self.backoff_jitter,
        )
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            profile: default_profile_name(),
            schedule: ScheduleConfig::default(),
            liquidation: LiquidationConfig::default(),
            driver: DriverConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self, MonitorError> {
        let content = std::fs::read_to_string(path).map_err(|e| MonitorError::Config {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| MonitorError::Config {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Short timers for local runs against a dev chain.
    pub fn fast() -> Self {
        Self {
            profile: "fast".to_string(),
            driver: DriverConfig {
                tick_mode: TickMode::Interval,
                poll_interval_secs: 2,
                sweep_interval_secs: 10,
                watchdog_interval_secs: 5,
                silence_window_secs: 30,
                backoff_base_ms: 200,
                backoff_max_ms: 5_000,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Profile from `MONITOR_PROFILE`, or default.
    pub fn from_profile_env() -> Self {
        let profile = std::env::var("MONITOR_PROFILE").unwrap_or_else(|_| "default".to_string());
        match profile.to_lowercase().as_str() {
            "fast" | "dev" => Self::fast(),
            _ => Self::default(),
        }
    }

    /// File named by `MONITOR_CONFIG`, else the `MONITOR_PROFILE` profile.
    pub fn load() -> Result<Self, MonitorError> {
        match std::env::var("MONITOR_CONFIG") {
            Ok(path) if !path.is_empty() => Self::from_file(&path),
            _ => Ok(Self::from_profile_env()),
        }
    }

    /// Check everything that would otherwise fail later at runtime.
    pub fn validate(&self) -> Result<(), MonitorError> {
        self.schedule.tz()?;
        if self.schedule.target_hour > 23 || self.schedule.target_minute > 59 {
            return Err(MonitorError::InvalidTargetTime {
                hour: self.schedule.target_hour,
                minute: self.schedule.target_minute,
            });
        }
        self.liquidation.thresholds()?;
        self.driver.validate_intervals()?;
        self.driver.backoff_policy()?;
        Ok(())
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        tracing::info!(profile = %self.profile, "Monitor configuration loaded");
        tracing::info!(
            time_zone = %self.schedule.time_zone,
            target_hour = self.schedule.target_hour,
            target_minute = self.schedule.target_minute,
            run_on_startup = self.schedule.run_on_startup,
            "Daily schedule"
        );
        tracing::info!(
            pre_filter_cr = %self.liquidation.pre_filter_cr,
            min_debt = %self.liquidation.min_debt,
            alert_cr = %self.liquidation.alert_cr,
            "Liquidation thresholds"
        );
        tracing::info!(
            tick_mode = ?self.driver.tick_mode,
            sweep_interval_secs = self.driver.sweep_interval_secs,
            watchdog_interval_secs = self.driver.watchdog_interval_secs,
            silence_window_secs = self.driver.silence_window_secs,
            backoff_base_ms = self.driver.backoff_base_ms,
            backoff_max_ms = self.driver.backoff_max_ms,
            backoff_jitter = self.driver.backoff_jitter,
            "Driver timing"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.schedule.time_zone, "America/Chicago");
        assert_eq!(config.schedule.target_hour, 5);
        assert_eq!(config.driver.silence_window(), Duration::from_secs(300));
        config.validate().unwrap();
    }

    #[test]
    fn test_default_thresholds() {
        let thresholds = MonitorConfig::default().liquidation.thresholds().unwrap();
        assert_eq!(thresholds.pre_filter_cr, U256::from(1_750_000_000_000_000_000u128));
        assert_eq!(thresholds.min_debt, U256::from(100_000_000_000_000_000_000u128));
        assert_eq!(thresholds.alert_cr, U256::from(1_500_000_000_000_000_000u128));
    }

    #[test]
    fn test_partial_toml() {
        let parsed: MonitorConfig = toml::from_str(
            r#"
            [schedule]
            time_zone = "Europe/Berlin"

            [driver]
            tick_mode = "interval"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.schedule.time_zone, "Europe/Berlin");
        assert_eq!(parsed.schedule.target_hour, 5);
        assert_eq!(parsed.driver.tick_mode, TickMode::Interval);
        assert_eq!(parsed.driver.backoff_max_ms, 60_000);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = MonitorConfig::default();
        config.schedule.time_zone = "Mars/Olympus".into();
        assert!(matches!(config.validate(), Err(MonitorError::InvalidTimeZone(_))));

        let mut config = MonitorConfig::default();
        config.schedule.target_hour = 24;
        assert!(matches!(config.validate(), Err(MonitorError::InvalidTargetTime { .. })));

        let mut config = MonitorConfig::default();
        config.liquidation.alert_cr = "one".into();
        assert!(matches!(config.validate(), Err(MonitorError::InvalidAmount(_))));
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let mut config = MonitorConfig::default();
        config.driver.watchdog_interval_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(MonitorError::ZeroInterval("watchdog_interval_secs"))
        ));

        let mut config = MonitorConfig::default();
        config.driver.poll_interval_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(MonitorError::ZeroInterval("poll_interval_secs"))
        ));

        let mut config = MonitorConfig::default();
        config.driver.silence_window_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(MonitorError::ZeroInterval("silence_window_secs"))
        ));
    }

    #[test]
    fn test_serialization() {
        let config = MonitorConfig::fast();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("profile = \"fast\""));

        let parsed: MonitorConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.driver.tick_mode, TickMode::Interval);
    }
}
