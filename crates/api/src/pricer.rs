//! DefiLlama spot price client.

use anyhow::{Context, Result};
use dashmap::DashMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

const DEFAULT_BASE_URL: &str = "https://coins.llama.fi";

/// Assets priced by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceAsset {
    Eth,
    Dyad,
    Kerosene,
}

impl PriceAsset {
    /// DefiLlama coin key.
    pub fn coin_key(&self) -> &'static str {
        match self {
            PriceAsset::Eth => "coingecko:ethereum",
            PriceAsset::Dyad => "coingecko:dyad",
            PriceAsset::Kerosene => "coingecko:kerosene",
        }
    }
}

#[derive(Clone, Copy)]
struct CachedPrice {
    price: f64,
    cached_at: Instant,
}

#[derive(Debug, Deserialize)]
struct PricesResponse {
    coins: HashMap<String, CoinPrice>,
}

#[derive(Debug, Deserialize)]
struct CoinPrice {
    price: f64,
}

/// Price client with a short-lived cache.
///
/// Prices are best-effort: lookup failures are logged and yield `0.0`.
#[derive(Clone)]
pub struct PriceClient {
    client: reqwest::Client,
    base_url: String,
    cache: Arc<DashMap<PriceAsset, CachedPrice>>,
    cache_ttl: Duration,
}

impl std::fmt::Debug for PriceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceClient")
            .field("base_url", &self.base_url)
            .field("cache_size", &self.cache.len())
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl PriceClient {
    pub fn new() -> Self {
        Self::with_cache_ttl(Duration::from_secs(60))
    }

    pub fn with_cache_ttl(cache_ttl: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            cache: Arc::new(DashMap::new()),
            cache_ttl,
        }
    }

    /// USD price of `asset`, or `0.0` when unavailable.
    #[instrument(skip(self))]
    pub async fn price(&self, asset: PriceAsset) -> f64 {
        if let Some(cached) = self.cache.get(&asset) {
            if cached.cached_at.elapsed() < self.cache_ttl {
                return cached.price;
            }
        }

        match self.fetch(asset).await {
            Ok(price) => {
                self.cache.insert(
                    asset,
                    CachedPrice {
                        price,
                        cached_at: Instant::now(),
                    },
                );
                price
            }
            Err(e) => {
                warn!(coin = asset.coin_key(), error = %e, "Price lookup failed");
                0.0
            }
        }
    }

    async fn fetch(&self, asset: PriceAsset) -> Result<f64> {
        let key = asset.coin_key();
        let url = format!("{}/prices/current/{}?searchWidth=4h", self.base_url, key);

        let body: PricesResponse = self
            .client
            .get(&url)
            .send()
            .await
            .context("price request failed")?
            .error_for_status()?
            .json()
            .await?;

        let price = extract_price(&body, key)?;
        debug!(coin = key, price, "Fetched price");
        Ok(price)
    }
}

impl Default for PriceClient {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_price(body: &PricesResponse, key: &str) -> Result<f64> {
    body.coins
        .get(key)
        .map(|c| c.price)
        .ok_or_else(|| anyhow::anyhow!("no price returned for {key}"))
}
