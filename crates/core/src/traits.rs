//! Collaborator interfaces consumed by the scheduling and polling engine.
//!
//! The engine only sees these traits; concrete clients are wired in
//! `adapters` and test doubles in `testing`.

use crate::error::TickSourceError;
use alloy::primitives::U256;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::Stream;
use note_monitor_api::NoteSnapshot;
use std::pin::Pin;

/// Numeric note state read from the chain. Every call may fail transiently.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Collateral ratio (1e18-scaled).
    async fn collateral_ratio(&self, note_id: &str) -> Result<U256>;

    /// Total collateral value (1e18 USD).
    async fn total_value(&self, note_id: &str) -> Result<U256>;

    /// Exogenous and kerosene collateral values (1e18 USD).
    async fn vault_values(&self, note_id: &str) -> Result<(U256, U256)>;

    /// Minted DYAD (1e18).
    async fn debt(&self, note_id: &str) -> Result<U256>;

    /// Timestamp of the latest block (unix seconds).
    async fn current_block_timestamp(&self) -> Result<u64>;

    /// Current gas price (wei).
    async fn gas_price(&self) -> Result<u128>;
}

/// Liquidation candidate discovery.
#[async_trait]
pub trait CandidateSearch: Send + Sync {
    /// Snapshot of indexed notes, at most 1000 items.
    async fn search(&self) -> Result<Vec<NoteSnapshot>>;
}

/// Builds the human-readable note report.
#[async_trait]
pub trait ReportBuilder: Send + Sync {
    async fn build(&self, note_id: &str, allow_claim: bool) -> Result<String>;
}

/// Operator channel. Delivery is best-effort and failures are logged by
/// the implementation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str);
}

/// A new block notification or timer fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    /// Block number, when the tick came from a block
    pub block_number: Option<u64>,
    /// Block time, or wall-clock time for timer ticks
    pub timestamp: DateTime<Utc>,
    /// Gas price in wei, when known
    pub gas_price: Option<u128>,
}

impl Tick {
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            block_number: None,
            timestamp,
            gas_price: None,
        }
    }
}

/// Ticks and errors from one subscription. The stream ending means the
/// subscription closed; dropping it unsubscribes.
pub type TickStream = Pin<Box<dyn Stream<Item = Result<Tick, TickSourceError>> + Send>>;

/// Produces tick subscriptions. Each call opens a fresh subscription.
#[async_trait]
pub trait TickSource: Send + Sync {
    async fn subscribe(&self) -> Result<TickStream, TickSourceError>;

    /// Short label for logs and operator notices.
    fn describe(&self) -> String;
}
