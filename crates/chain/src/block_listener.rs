//! WebSocket new-head subscription.

use alloy::providers::{Provider, ProviderBuilder, WsConnect};
use anyhow::Result;
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;
use tracing::info;

/// Summary of a new block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHead {
    pub number: u64,
    pub timestamp: u64,
    /// Base fee in wei (post-London blocks)
    pub base_fee_per_gas: Option<u64>,
}

/// Stream of new block heads. Ends when the socket closes.
pub type BlockStream = Pin<Box<dyn Stream<Item = BlockHead> + Send>>;

/// Subscribes to new block headers over WebSocket.
#[derive(Debug, Clone)]
pub struct BlockListener {
    ws_url: String,
}

impl BlockListener {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
        }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Open a fresh connection and subscribe to new heads.
    ///
    /// Each call owns its own socket; dropping the returned stream closes it.
    pub async fn subscribe_new_heads(&self) -> Result<BlockStream> {
        info!(ws_url = %self.ws_url, "Subscribing to new block headers");

        let ws = WsConnect::new(&self.ws_url);
        let provider = ProviderBuilder::new().on_ws(ws).await?;
        info!("WebSocket connected for new block headers");

        let sub = provider.subscribe_blocks().await?;
        let inner_stream = sub.into_stream();

        // The provider lives in the stream state so the socket stays open.
        let block_stream = futures::stream::unfold(
            (provider, inner_stream),
            |(provider, mut stream)| async move {
                let header = stream.next().await?;
                let head = BlockHead {
                    number: header.number,
                    timestamp: header.timestamp,
                    base_fee_per_gas: header.base_fee_per_gas,
                };
                Some((head, (provider, stream)))
            },
        );

        Ok(Box::pin(block_stream))
    }
}
