//! Trait implementations over the concrete chain and HTTP clients.

use crate::error::TickSourceError;
use crate::traits::{CandidateSearch, ChainReader, Notifier, Tick, TickSource, TickStream};
use alloy::primitives::U256;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::StreamExt;
use note_monitor_api::{DiscordNotifier, NoteSearchClient, NoteSnapshot};
use note_monitor_chain::{parse_note_id, BlockHead, BlockListener, BlockStream, NoteReader};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::debug;

#[async_trait]
impl ChainReader for NoteReader {
    async fn collateral_ratio(&self, note_id: &str) -> Result<U256> {
        NoteReader::collateral_ratio(self, parse_note_id(note_id)?).await
    }

    async fn total_value(&self, note_id: &str) -> Result<U256> {
        NoteReader::total_value(self, parse_note_id(note_id)?).await
    }

    async fn vault_values(&self, note_id: &str) -> Result<(U256, U256)> {
        let values = NoteReader::vault_values(self, parse_note_id(note_id)?).await?;
        Ok((values.exo_value, values.kero_value))
    }

    async fn debt(&self, note_id: &str) -> Result<U256> {
        self.minted_dyad(parse_note_id(note_id)?).await
    }

    async fn current_block_timestamp(&self) -> Result<u64> {
        Ok(self.latest_block().await?.timestamp)
    }

    async fn gas_price(&self) -> Result<u128> {
        NoteReader::gas_price(self).await
    }
}

#[async_trait]
impl CandidateSearch for NoteSearchClient {
    async fn search(&self) -> Result<Vec<NoteSnapshot>> {
        NoteSearchClient::search(self).await
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, message: &str) {
        DiscordNotifier::send(self, message).await
    }
}

fn block_time(timestamp: u64) -> DateTime<Utc> {
    i64::try_from(timestamp)
        .ok()
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .unwrap_or_else(Utc::now)
}

/// Ticks on every new block head, priced with the node's current gas price.
pub struct BlockTickSource {
    listener: BlockListener,
    reader: Arc<dyn ChainReader>,
}

impl BlockTickSource {
    pub fn new(listener: BlockListener, reader: Arc<dyn ChainReader>) -> Self {
        Self { listener, reader }
    }
}

/// Falls back to the head's base fee when the gas price read fails.
fn priced_ticks(heads: BlockStream, reader: Arc<dyn ChainReader>) -> TickStream {
    let ticks = heads.then(move |head: BlockHead| {
        let reader = reader.clone();
        async move {
            let gas_price = match reader.gas_price().await {
                Ok(price) => Some(price),
                Err(e) => {
                    debug!(block = head.number, error = %e, "Gas price unavailable, using base fee");
                    head.base_fee_per_gas.map(u128::from)
                }
            };
            Ok(Tick {
                block_number: Some(head.number),
                timestamp: block_time(head.timestamp),
                gas_price,
            })
        }
    });
    Box::pin(ticks)
}

#[async_trait]
impl TickSource for BlockTickSource {
    async fn subscribe(&self) -> Result<TickStream, TickSourceError> {
        let heads = self
            .listener
            .subscribe_new_heads()
            .await
            .map_err(TickSourceError::subscribe)?;

        Ok(priced_ticks(heads, self.reader.clone()))
    }

    fn describe(&self) -> String {
        "block subscription".to_string()
    }
}

/// Ticks on a fixed period, stamped with the latest block time.
pub struct IntervalTickSource {
    reader: Arc<dyn ChainReader>,
    period: Duration,
}

impl IntervalTickSource {
    pub fn new(reader: Arc<dyn ChainReader>, period: Duration) -> Self {
        Self { reader, period }
    }
}

#[async_trait]
impl TickSource for IntervalTickSource {
    async fn subscribe(&self) -> Result<TickStream, TickSourceError> {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let ticks = futures::stream::unfold(
            (interval, self.reader.clone()),
            |(mut interval, reader)| async move {
                interval.tick().await;
                let (timestamp, gas_price) =
                    tokio::join!(reader.current_block_timestamp(), reader.gas_price());
                let item = timestamp
                    .map(|ts| Tick {
                        block_number: None,
                        timestamp: block_time(ts),
                        gas_price: gas_price.ok(),
                    })
                    .map_err(TickSourceError::poll);
                Some((item, (interval, reader)))
            },
        );
        Ok(Box::pin(ticks))
    }

    fn describe(&self) -> String {
        format!("{}s poll", self.period.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChainReader;

    #[test]
    fn test_block_time() {
        assert_eq!(block_time(1_700_000_000).timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn test_block_ticks_use_node_gas_price() {
        let heads: BlockStream = Box::pin(futures::stream::iter(vec![BlockHead {
            number: 19_000_000,
            timestamp: 1_700_000_000,
            base_fee_per_gas: Some(8_000_000_000),
        }]));

        let mut ticks = priced_ticks(heads, Arc::new(MockChainReader::default()));
        let tick = ticks.next().await.unwrap().unwrap();
        assert_eq!(tick.block_number, Some(19_000_000));
        assert_eq!(tick.timestamp.timestamp(), 1_700_000_000);
        assert_eq!(tick.gas_price, Some(20_000_000_000));
        assert!(ticks.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_source_stamps_block_time() {
        let reader = Arc::new(MockChainReader::default().with_block_timestamp(1_700_000_000));
        let source = IntervalTickSource::new(reader.clone(), Duration::from_secs(12));

        let mut ticks = source.subscribe().await.unwrap();
        let first = ticks.next().await.unwrap().unwrap();
        assert_eq!(first.timestamp.timestamp(), 1_700_000_000);
        assert_eq!(first.block_number, None);

        reader.fail_block_timestamp();
        assert!(matches!(ticks.next().await, Some(Err(TickSourceError::Poll(_)))));
    }
}
