//! Rewards and yields API client.

use alloy::primitives::{B256, U256};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default rewards/yields API base URL.
pub const DEFAULT_API_URL: &str = "https://api.dyadstable.xyz";

/// Merkle reward entitlement for a note.
#[derive(Debug, Clone, Deserialize)]
pub struct Rewards {
    /// Cumulative KERO entitled (1e18-scaled)
    #[serde(deserialize_with = "deserialize_u256")]
    pub amount: U256,
    /// Merkle proof for `claimToVault`
    #[serde(default)]
    pub proof: Vec<B256>,
}

/// Yield data for one LP staking vault of a note.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultYield {
    /// LP token address
    #[serde(default)]
    pub lp_token: String,
    /// Note liquidity staked in this vault
    #[serde(default, deserialize_with = "deserialize_f64")]
    pub note_liquidity: f64,
    /// Annualised KERO emission to the note
    #[serde(default, deserialize_with = "deserialize_f64")]
    pub kerosene_per_year: f64,
    /// Note XP (same value in every vault entry)
    #[serde(default, deserialize_with = "deserialize_optional_f64")]
    pub note_xp: Option<f64>,
}

/// Yields keyed by vault identifier.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct NoteYields(pub BTreeMap<String, VaultYield>);

impl NoteYields {
    /// XP of the note, taken from the first vault entry.
    pub fn note_xp(&self) -> Option<f64> {
        self.0.values().next().and_then(|v| v.note_xp)
    }

    /// Vaults with a non-zero staked liquidity.
    pub fn active_vaults(&self) -> impl Iterator<Item = &VaultYield> {
        self.0.values().filter(|v| v.note_liquidity > 0.0)
    }
}

/// Client for the rewards and yields endpoints.
#[derive(Debug, Clone)]
pub struct RewardsClient {
    client: reqwest::Client,
    base_url: String,
}

impl RewardsClient {
    /// Create a client against the default API.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_API_URL)
    }

    /// Create a client with custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetch the reward entitlement and proof for a note.
    #[instrument(skip(self))]
    pub async fn fetch_rewards(&self, note_id: &str) -> Result<Rewards> {
        let url = format!("{}/api/rewards/{}", self.base_url, note_id);
        let rewards: Rewards = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("rewards request failed for note {note_id}"))?
            .error_for_status()?
            .json()
            .await?;

        debug!(note_id, amount = %rewards.amount, proof_len = rewards.proof.len(), "Fetched rewards");
        Ok(rewards)
    }

    /// Fetch LP yields for a note.
    #[instrument(skip(self))]
    pub async fn fetch_yields(&self, note_id: &str) -> Result<NoteYields> {
        let url = format!("{}/api/yields/{}", self.base_url, note_id);
        let yields: NoteYields = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("yields request failed for note {note_id}"))?
            .error_for_status()?
            .json()
            .await?;

        debug!(note_id, vaults = yields.0.len(), "Fetched yields");
        Ok(yields)
    }
}

impl Default for RewardsClient {
    fn default() -> Self {
        Self::new()
    }
}

// Custom deserializers

fn deserialize_u256<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u64),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        StringOrNumber::Number(n) => Ok(U256::from(n)),
    }
}

fn deserialize_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(deserialize_optional_f64(deserializer)?.unwrap_or(0.0))
}

fn deserialize_optional_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(f64),
    }

    match Option::<StringOrNumber>::deserialize(deserializer)? {
        Some(StringOrNumber::String(s)) if s.is_empty() => Ok(None),
        Some(StringOrNumber::String(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
        Some(StringOrNumber::Number(n)) => Ok(Some(n)),
        None => Ok(None),
    }
}
