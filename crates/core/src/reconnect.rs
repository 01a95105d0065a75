//! Connection state machine and jittered exponential backoff for the tick
//! source.

use crate::error::MonitorError;
use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

/// Tick source connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    BackingOff,
    /// Terminal
    Shutdown,
}

/// `min(max, base * 2^(attempt-1)) * (1 + U(0, jitter))`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    base: Duration,
    max: Duration,
    jitter: f64,
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration, jitter: f64) -> Result<Self, MonitorError> {
        if base.is_zero() {
            return Err(MonitorError::InvalidBackoff("base delay must be positive".into()));
        }
        if max < base {
            return Err(MonitorError::InvalidBackoff(format!(
                "max delay {max:?} is below base delay {base:?}"
            )));
        }
        if !(0.0..=1.0).contains(&jitter) {
            return Err(MonitorError::InvalidBackoff(format!("jitter {jitter} outside [0, 1]")));
        }
        Ok(Self { base, max, jitter })
    }

    /// Delay before jitter. Attempt numbering starts at 1.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        self.base
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max)
    }

    /// Delay with an explicit jitter sample in `[0, 1)`.
    pub fn delay_with(&self, attempt: u32, sample: f64) -> Duration {
        let sample = sample.clamp(0.0, 1.0);
        self.base_delay(attempt).mul_f64(1.0 + sample * self.jitter)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, rand::thread_rng().gen::<f64>())
    }

    pub fn max_delay(&self) -> Duration {
        self.max
    }
}

/// Tracks connection state, the reconnect attempt counter and tick liveness.
#[derive(Debug)]
pub struct ReconnectController {
    policy: BackoffPolicy,
    state: ConnectionState,
    attempt: u32,
    last_tick: Option<Instant>,
    /// Set on each new subscription until its first tick arrives
    awaiting_first_tick: bool,
}

impl ReconnectController {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            state: ConnectionState::Disconnected,
            attempt: 0,
            last_tick: None,
            awaiting_first_tick: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn last_tick(&self) -> Option<Instant> {
        self.last_tick
    }

    /// Disconnected/BackingOff -> Connecting.
    pub fn begin_connect(&mut self) {
        if self.state != ConnectionState::Shutdown {
            self.state = ConnectionState::Connecting;
        }
    }

    /// Connecting -> Connected. The silence window starts now.
    pub fn on_connected(&mut self, now: Instant) {
        if self.state == ConnectionState::Shutdown {
            return;
        }
        self.state = ConnectionState::Connected;
        self.last_tick = Some(now);
        self.awaiting_first_tick = true;
    }

    /// Record a tick. Returns true if this tick reset the attempt counter.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        self.last_tick = Some(now);
        if self.awaiting_first_tick {
            self.awaiting_first_tick = false;
            let was_retrying = self.attempt > 0;
            self.attempt = 0;
            return was_retrying;
        }
        false
    }

    /// Any failure -> BackingOff. Returns the delay before the next attempt.
    pub fn on_failure(&mut self) -> Duration {
        self.on_failure_with(rand::thread_rng().gen::<f64>())
    }

    /// `on_failure` with an explicit jitter sample.
    pub fn on_failure_with(&mut self, sample: f64) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        self.state = ConnectionState::BackingOff;
        self.awaiting_first_tick = false;
        self.policy.delay_with(self.attempt, sample)
    }

    /// Connected and silent for longer than `window`.
    pub fn is_stalled(&self, now: Instant, window: Duration) -> bool {
        self.state == ConnectionState::Connected
            && self
                .last_tick
                .is_some_and(|last| now.saturating_duration_since(last) > window)
    }

    /// Terminal.
    pub fn shutdown(&mut self) {
        self.state = ConnectionState::Shutdown;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(60), 0.25).unwrap()
    }

    #[test]
    fn test_policy_validation() {
        assert!(BackoffPolicy::new(Duration::ZERO, Duration::from_secs(1), 0.1).is_err());
        assert!(BackoffPolicy::new(Duration::from_secs(2), Duration::from_secs(1), 0.1).is_err());
        assert!(BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(1), 1.5).is_err());
    }

    #[test]
    fn test_base_delay_doubles_then_caps() {
        let policy = policy();
        let delays: Vec<u64> = (1..=8).map(|a| policy.base_delay(a).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 60, 60]);
        assert_eq!(policy.base_delay(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = policy();
        assert_eq!(policy.delay_with(3, 0.0), Duration::from_secs(4));
        assert_eq!(policy.delay_with(3, 1.0), Duration::from_secs(5));
        for _ in 0..100 {
            let d = policy.delay(10);
            assert!(d >= Duration::from_secs(60) && d <= Duration::from_secs(75));
        }
    }

    #[test]
    fn test_delay_non_decreasing() {
        let policy = policy();
        for sample in [0.0, 0.5, 0.99] {
            let mut prev = Duration::ZERO;
            for attempt in 1..20 {
                let d = policy.delay_with(attempt, sample);
                assert!(d >= prev, "attempt {attempt}");
                prev = d;
            }
        }
    }

    #[test]
    fn test_attempt_resets_on_first_tick_after_reconnect() {
        let mut ctl = ReconnectController::new(policy());
        let t0 = Instant::now();

        ctl.begin_connect();
        ctl.on_connected(t0);
        assert_eq!(ctl.state(), ConnectionState::Connected);
        assert!(!ctl.on_tick(t0));

        // close
        let delay = ctl.on_failure_with(0.0);
        assert_eq!(ctl.attempt(), 1);
        assert_eq!(delay, Duration::from_secs(1));
        assert_eq!(ctl.state(), ConnectionState::BackingOff);

        // subscribe fails once more
        ctl.begin_connect();
        assert_eq!(ctl.on_failure_with(0.0), Duration::from_secs(2));
        assert_eq!(ctl.attempt(), 2);

        // success is not enough; the first tick resets
        ctl.begin_connect();
        ctl.on_connected(t0);
        assert_eq!(ctl.attempt(), 2);
        assert!(ctl.on_tick(t0));
        assert_eq!(ctl.attempt(), 0);
    }

    #[test]
    fn test_stall_detection() {
        let mut ctl = ReconnectController::new(policy());
        let t0 = Instant::now();
        let window = Duration::from_secs(300);

        assert!(!ctl.is_stalled(t0 + Duration::from_secs(1000), window));

        ctl.begin_connect();
        ctl.on_connected(t0);
        assert!(!ctl.is_stalled(t0 + window, window));
        assert!(ctl.is_stalled(t0 + window + Duration::from_secs(1), window));

        ctl.on_tick(t0 + window);
        assert!(!ctl.is_stalled(t0 + window + Duration::from_secs(1), window));
    }

    #[test]
    fn test_shutdown_is_terminal() {
        let mut ctl = ReconnectController::new(policy());
        ctl.shutdown();
        ctl.begin_connect();
        ctl.on_connected(Instant::now());
        assert_eq!(ctl.state(), ConnectionState::Shutdown);
    }
}
