//! In-memory collaborators for unit tests.

use crate::error::TickSourceError;
use crate::traits::{CandidateSearch, ChainReader, Notifier, ReportBuilder, Tick, TickSource, TickStream};
use crate::u256_math::parse_wad;
use alloy::primitives::U256;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use note_monitor_api::NoteSnapshot;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn wad(value: &str) -> U256 {
    parse_wad(value).unwrap()
}

pub fn snapshot(id: &str, collat_ratio: U256, dyad: U256) -> NoteSnapshot {
    NoteSnapshot {
        id: id.to_string(),
        collat_ratio,
        kerosene: U256::ZERO,
        dyad,
        xp: U256::ZERO,
        collateral: U256::ZERO,
    }
}

pub struct MockReportBuilder {
    result: Result<String, String>,
    calls: Mutex<Vec<(String, bool)>>,
}

impl MockReportBuilder {
    pub fn ok(report: &str) -> Self {
        Self {
            result: Ok(report.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportBuilder for MockReportBuilder {
    async fn build(&self, note_id: &str, allow_claim: bool) -> Result<String> {
        self.calls.lock().unwrap().push((note_id.to_string(), allow_claim));
        self.result.clone().map_err(|e| anyhow!(e))
    }
}

pub struct MockCandidateSearch {
    result: Result<Vec<NoteSnapshot>, String>,
}

impl MockCandidateSearch {
    pub fn ok(notes: Vec<NoteSnapshot>) -> Self {
        Self { result: Ok(notes) }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl CandidateSearch for MockCandidateSearch {
    async fn search(&self) -> Result<Vec<NoteSnapshot>> {
        self.result.clone().map_err(|e| anyhow!(e))
    }
}

/// Per-note CR and exogenous value; unknown or failing notes error.
#[derive(Default)]
pub struct MockChainReader {
    notes: HashMap<String, (U256, U256)>,
    failing: HashSet<String>,
    block_timestamp: u64,
    block_timestamp_fails: AtomicBool,
    reads: Mutex<HashMap<String, usize>>,
    timestamp_reads: AtomicUsize,
}

impl MockChainReader {
    pub fn with_note(mut self, id: &str, cr: U256, exo_value: U256) -> Self {
        self.notes.insert(id.to_string(), (cr, exo_value));
        self
    }

    pub fn with_failing_note(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn with_block_timestamp(mut self, timestamp: u64) -> Self {
        self.block_timestamp = timestamp;
        self
    }

    pub fn fail_block_timestamp(&self) {
        self.block_timestamp_fails.store(true, Ordering::SeqCst);
    }

    /// Number of chain reads made for `id`.
    pub fn reads_for(&self, id: &str) -> usize {
        self.reads.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    pub fn timestamp_reads(&self) -> usize {
        self.timestamp_reads.load(Ordering::SeqCst)
    }

    fn note(&self, id: &str) -> Result<(U256, U256)> {
        *self.reads.lock().unwrap().entry(id.to_string()).or_default() += 1;
        if self.failing.contains(id) {
            return Err(anyhow!("execution reverted for note {id}"));
        }
        self.notes
            .get(id)
            .copied()
            .ok_or_else(|| anyhow!("unknown note {id}"))
    }
}

#[async_trait]
impl ChainReader for MockChainReader {
    async fn collateral_ratio(&self, note_id: &str) -> Result<U256> {
        Ok(self.note(note_id)?.0)
    }

    async fn total_value(&self, note_id: &str) -> Result<U256> {
        Ok(self.note(note_id)?.1)
    }

    async fn vault_values(&self, note_id: &str) -> Result<(U256, U256)> {
        Ok((self.note(note_id)?.1, U256::ZERO))
    }

    async fn debt(&self, note_id: &str) -> Result<U256> {
        self.note(note_id)?;
        Ok(U256::ZERO)
    }

    async fn current_block_timestamp(&self) -> Result<u64> {
        self.timestamp_reads.fetch_add(1, Ordering::SeqCst);
        if self.block_timestamp_fails.load(Ordering::SeqCst) {
            return Err(anyhow!("rpc unavailable"));
        }
        Ok(self.block_timestamp)
    }

    async fn gas_price(&self) -> Result<u128> {
        Ok(20_000_000_000)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) {
        self.sent.lock().unwrap().push(message.to_string());
    }
}

/// Records each message only after `delay` has passed.
pub struct SlowNotifier {
    delay: Duration,
    inner: RecordingNotifier,
}

impl SlowNotifier {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: RecordingNotifier::default(),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.inner.messages()
    }
}

#[async_trait]
impl Notifier for SlowNotifier {
    async fn send(&self, message: &str) {
        tokio::time::sleep(self.delay).await;
        self.inner.send(message).await;
    }
}

fn tick_stream(ticks: Vec<Tick>) -> impl Stream<Item = Result<Tick, TickSourceError>> + Send {
    stream::iter(ticks.into_iter().map(Ok))
}

/// What one `subscribe` call yields.
pub enum Script {
    /// `subscribe` itself fails
    Refuse(String),
    /// Emit the ticks, then end the stream
    Close(Vec<Tick>),
    /// Emit the ticks, then go silent without closing
    Hang(Vec<Tick>),
}

/// Plays scripted subscriptions in order. Once the script runs out every
/// subscription hangs.
#[derive(Default)]
pub struct ScriptedTickSource {
    scripts: Mutex<VecDeque<Script>>,
    subscriptions: AtomicUsize,
}

impl ScriptedTickSource {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            subscriptions: AtomicUsize::new(0),
        }
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TickSource for ScriptedTickSource {
    async fn subscribe(&self) -> Result<TickStream, TickSourceError> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().unwrap().pop_front();

        match script {
            Some(Script::Refuse(reason)) => Err(TickSourceError::Subscribe(reason)),
            Some(Script::Close(ticks)) => Ok(Box::pin(tick_stream(ticks))),
            Some(Script::Hang(ticks)) => Ok(Box::pin(tick_stream(ticks).chain(stream::pending()))),
            None => Ok(Box::pin(stream::pending::<Result<Tick, TickSourceError>>())),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}
