//! Historical liquidation events.

use crate::addresses::VAULT_MANAGER;
use crate::contracts::IVaultManager;
use crate::reader::NoteReader;
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, B256, U256};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use tracing::{info, instrument};

/// Average mainnet block time used for date to block conversion.
pub const AVERAGE_BLOCK_TIME_SECS: u64 = 13;

/// One `Liquidate` event.
#[derive(Debug, Clone)]
pub struct LiquidationEvent {
    /// Liquidated note
    pub id: U256,
    /// Liquidator account
    pub from: Address,
    /// Note receiving the collateral
    pub to: U256,
    /// DYAD repaid (1e18)
    pub amount: U256,
    pub block_number: u64,
    pub tx_hash: B256,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Fetch `Liquidate` events between `from_block` and `to_block` (latest when `None`).
#[instrument(skip(reader))]
pub async fn fetch_liquidations(
    reader: &NoteReader,
    from_block: u64,
    to_block: Option<u64>,
) -> Result<Vec<LiquidationEvent>> {
    let manager = IVaultManager::new(VAULT_MANAGER, reader.provider());
    let to_tag = to_block.map_or(BlockNumberOrTag::Latest, BlockNumberOrTag::Number);

    info!(from_block, to_block = %to_tag, "Fetching Liquidate events");

    let logs = manager
        .Liquidate_filter()
        .from_block(from_block)
        .to_block(to_tag)
        .query()
        .await
        .context("Liquidate log query failed")?;

    let mut timestamps: HashMap<u64, u64> = HashMap::new();
    let mut events = Vec::with_capacity(logs.len());

    for (event, log) in logs {
        let block_number = log.block_number.unwrap_or(0);
        let timestamp = match log.block_timestamp {
            Some(ts) => Some(ts),
            None if block_number > 0 => match timestamps.get(&block_number) {
                Some(ts) => Some(*ts),
                None => {
                    let ts = reader.block(BlockNumberOrTag::Number(block_number)).await?.timestamp;
                    timestamps.insert(block_number, ts);
                    Some(ts)
                }
            },
            None => None,
        };

        events.push(LiquidationEvent {
            id: event.id,
            from: event.from,
            to: event.to,
            amount: event.amount,
            block_number,
            tx_hash: log.transaction_hash.unwrap_or_default(),
            timestamp: timestamp.and_then(|ts| DateTime::from_timestamp(ts as i64, 0)),
        });
    }

    info!(count = events.len(), "Fetched Liquidate events");
    Ok(events)
}

/// Approximate the first block of `date` (UTC) from the current head.
pub fn date_to_block(date: NaiveDate, current_block: u64, current_timestamp: u64) -> u64 {
    let target = date
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or(0)
        .max(0) as u64;

    let block_diff = current_timestamp.saturating_sub(target) / AVERAGE_BLOCK_TIME_SECS;
    current_block.saturating_sub(block_diff).max(1)
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format: {date}. Use YYYY-MM-DD format."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_to_block() {
        let date = parse_date("2024-01-01").unwrap();
        let midnight = 1_704_067_200u64;

        // One day later at 13s per block
        let current_ts = midnight + 86_400;
        let block = date_to_block(date, 20_000_000, current_ts);
        assert_eq!(block, 20_000_000 - 86_400 / 13);
    }

    #[test]
    fn test_date_to_block_clamps() {
        let date = parse_date("2015-07-30").unwrap();
        assert_eq!(date_to_block(date, 100, 1_704_067_200), 1);

        // A date in the future maps to the current block
        let date = parse_date("2030-01-01").unwrap();
        assert_eq!(date_to_block(date, 500, 1_704_067_200), 500);
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("01/02/2024").is_err());
    }
}
