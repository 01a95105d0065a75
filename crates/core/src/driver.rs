//! Tick-driven supervisor for the daily check and liquidation sweep.
//!
//! The supervisor owns the subscription, the watchdog and the backoff
//! timer. Ticks are handed over a bounded channel to a single worker that
//! runs the business logic sequentially, so a slow report or notifier never
//! delays reconnection. Reconnect notices travel on a separate unbounded
//! channel and are delivered ahead of queued ticks.

use crate::config::MonitorConfig;
use crate::daily_check::DailyCheckProcessor;
use crate::liquidation::LiquidationMonitor;
use crate::reconnect::{BackoffPolicy, ConnectionState, ReconnectController};
use crate::traits::{Notifier, Tick, TickSource, TickStream};
use crate::u256_math::format_number;
use futures::stream::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Timer and queue settings for the driver.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub sweep_interval: Duration,
    pub watchdog_interval: Duration,
    pub silence_window: Duration,
    pub queue_capacity: usize,
    pub run_on_startup: bool,
}

impl DriverSettings {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            sweep_interval: config.driver.sweep_interval(),
            watchdog_interval: config.driver.watchdog_interval(),
            silence_window: config.driver.silence_window(),
            queue_capacity: config.driver.tick_queue_capacity.max(1),
            run_on_startup: config.schedule.run_on_startup,
        }
    }
}

/// Connection state published by a running driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverStatus {
    pub state: ConnectionState,
    pub attempt: u32,
}

/// Per-tick business logic: daily check, periodic sweep, notification.
pub struct TickProcessor {
    daily: DailyCheckProcessor,
    liquidations: LiquidationMonitor,
    notifier: Arc<dyn Notifier>,
    sweep_interval: Duration,
    run_on_startup: bool,
    started: bool,
    last_sweep: Option<Instant>,
}

impl TickProcessor {
    pub fn new(
        daily: DailyCheckProcessor,
        liquidations: LiquidationMonitor,
        notifier: Arc<dyn Notifier>,
        settings: &DriverSettings,
    ) -> Self {
        Self {
            daily,
            liquidations,
            notifier,
            sweep_interval: settings.sweep_interval,
            run_on_startup: settings.run_on_startup,
            started: false,
            last_sweep: None,
        }
    }

    /// Handle one tick and deliver its messages in order. Returns the number
    /// of messages sent.
    pub async fn process(&mut self, tick: &Tick) -> usize {
        info!("{}", tick_line(tick));

        let mut messages = if !self.started && self.run_on_startup {
            info!("Running startup note check");
            self.daily.run_now(tick.timestamp).await
        } else {
            self.daily.check_and_run(tick.timestamp).await
        };
        self.started = true;

        let now = Instant::now();
        if self.sweep_due(now) {
            self.last_sweep = Some(now);
            messages.extend(self.liquidations.sweep().await);
        }

        for message in &messages {
            self.notifier.send(message).await;
        }
        messages.len()
    }

    fn sweep_due(&self, now: Instant) -> bool {
        self.last_sweep
            .map_or(true, |last| now.saturating_duration_since(last) > self.sweep_interval)
    }

    async fn run(mut self, mut ticks: mpsc::Receiver<Tick>, mut notices: mpsc::UnboundedReceiver<String>) {
        loop {
            tokio::select! {
                biased;
                Some(notice) = notices.recv() => self.notifier.send(&notice).await,
                Some(tick) = ticks.recv() => {
                    self.process(&tick).await;
                }
                else => break,
            }
        }
        debug!("Tick processor stopped");
    }
}

fn tick_line(tick: &Tick) -> String {
    let gas = tick
        .gas_price
        .map(|wei| format_number(wei as f64 / 1e9, 2))
        .unwrap_or_else(|| "n/a".to_string());
    let time = tick.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    match tick.block_number {
        Some(number) => format!("Block #{number} | Time: {time} | Gas: {gas} gwei"),
        None => format!("Tick | Time: {time} | Gas: {gas} gwei"),
    }
}

enum Session {
    /// The subscription failed; carries the reason
    Ended(String),
    /// Shutdown requested while connected; the stream is still live
    Shutdown(TickStream),
}

/// Keeps a tick subscription alive and feeds the processor.
pub struct PollDriver {
    source: Arc<dyn TickSource>,
    processor: TickProcessor,
    controller: ReconnectController,
    settings: DriverSettings,
    status: watch::Sender<DriverStatus>,
}

impl PollDriver {
    pub fn new(
        source: Arc<dyn TickSource>,
        processor: TickProcessor,
        policy: BackoffPolicy,
        settings: DriverSettings,
    ) -> Self {
        let controller = ReconnectController::new(policy);
        let (status, _) = watch::channel(DriverStatus {
            state: controller.state(),
            attempt: controller.attempt(),
        });
        Self {
            source,
            processor,
            controller,
            settings,
            status,
        }
    }

    pub fn status(&self) -> watch::Receiver<DriverStatus> {
        self.status.subscribe()
    }

    /// Run until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let Self {
            source,
            processor,
            controller,
            settings,
            status,
        } = self;

        let (tick_tx, tick_rx) = mpsc::channel(settings.queue_capacity);
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(processor.run(tick_rx, notice_rx));

        let mut supervisor = Supervisor {
            source,
            controller,
            settings,
            status,
            ticks: tick_tx,
            notices: notice_tx,
        };
        supervisor.run(shutdown).await;

        // Closing both channels lets the worker drain and exit
        drop(supervisor);
        if let Err(e) = worker.await {
            error!(error = %e, "Tick processor panicked");
        }
        info!("Poll driver stopped");
    }
}

struct Supervisor {
    source: Arc<dyn TickSource>,
    controller: ReconnectController,
    settings: DriverSettings,
    status: watch::Sender<DriverStatus>,
    ticks: mpsc::Sender<Tick>,
    notices: mpsc::UnboundedSender<String>,
}

impl Supervisor {
    async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        let period = self.settings.watchdog_interval;
        let mut watchdog = interval_at(Instant::now() + period, period);
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let live_stream = loop {
            self.controller.begin_connect();
            self.publish();
            info!(source = %self.source.describe(), attempt = self.controller.attempt(), "Subscribing to tick source");

            let subscribed = tokio::select! {
                _ = &mut shutdown => break None,
                result = self.source.subscribe() => result,
            };

            let reason = match subscribed {
                Err(e) => e.to_string(),
                Ok(stream) => match self.pump(stream, &mut watchdog, shutdown.as_mut()).await {
                    Session::Ended(reason) => reason,
                    Session::Shutdown(stream) => break Some(stream),
                },
            };

            let delay = self.controller.on_failure();
            self.publish();
            let attempt = self.controller.attempt();
            warn!(
                source = %self.source.describe(),
                reason = %reason,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Tick source lost, backing off"
            );
            self.notify(format!(
                "Tick source {} {reason}; reconnecting in {delay:?} (attempt {attempt})",
                self.source.describe()
            ));

            let backoff = tokio::time::sleep(delay);
            tokio::select! {
                _ = &mut shutdown => break None,
                _ = backoff => {}
            }
        };

        // Timers first, then the subscription
        self.controller.shutdown();
        self.publish();
        drop(watchdog);
        drop(live_stream);
        info!("Tick source released");
    }

    async fn pump<S>(&mut self, mut stream: TickStream, watchdog: &mut Interval, mut shutdown: S) -> Session
    where
        S: Future<Output = ()> + Unpin,
    {
        self.controller.on_connected(Instant::now());
        self.publish();
        watchdog.reset();
        info!(source = %self.source.describe(), "Tick source connected");

        loop {
            tokio::select! {
                _ = &mut shutdown => return Session::Shutdown(stream),
                _ = watchdog.tick() => {
                    let window = self.settings.silence_window;
                    if self.controller.is_stalled(Instant::now(), window) {
                        return Session::Ended(format!("stalled (no tick for over {window:?})"));
                    }
                }
                item = stream.next() => match item {
                    Some(Ok(tick)) => {
                        if self.controller.on_tick(Instant::now()) {
                            info!("Tick source recovered, reconnect attempts reset");
                        }
                        self.publish();
                        self.enqueue(tick);
                    }
                    Some(Err(e)) => return Session::Ended(e.to_string()),
                    None => return Session::Ended("closed".to_string()),
                },
            }
        }
    }

    fn enqueue(&self, tick: Tick) {
        if let Err(e) = self.ticks.try_send(tick) {
            warn!(error = %e, "Tick processor busy, dropping tick");
        }
    }

    fn notify(&self, message: String) {
        if self.notices.send(message).is_err() {
            error!("Tick processor gone, reconnect notice lost");
        }
    }

    fn publish(&self) {
        self.status.send_replace(DriverStatus {
            state: self.controller.state(),
            attempt: self.controller.attempt(),
        });
    }
}
