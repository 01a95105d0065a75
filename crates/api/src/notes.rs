//! Note indexer client for liquidation candidate discovery.
//!
//! The indexer exposes a GraphQL endpoint that returns a snapshot of every
//! note. Snapshots may lag the chain; callers re-check anything they act on.

use alloy::primitives::U256;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Default indexer endpoint.
pub const DEFAULT_INDEXER_URL: &str = "https://api.dyadstable.xyz/";

/// Maximum number of notes returned by a single search.
pub const SEARCH_LIMIT: usize = 1000;

const NOTES_QUERY: &str = r#"{
  notes(limit: 1000) {
    items {
      id
      collatRatio
      kerosene
      dyad
      xp
      collateral
      __typename
    }
    __typename
  }
}"#;

/// Indexed snapshot of a note. All amounts are 1e18-scaled.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSnapshot {
    /// Note identifier
    pub id: String,
    /// Collateral ratio
    #[serde(deserialize_with = "deserialize_u256")]
    pub collat_ratio: U256,
    /// Kerosene deposited
    #[serde(deserialize_with = "deserialize_u256")]
    pub kerosene: U256,
    /// Minted DYAD (the note's debt)
    #[serde(deserialize_with = "deserialize_u256")]
    pub dyad: U256,
    /// Accrued XP
    #[serde(deserialize_with = "deserialize_u256")]
    pub xp: U256,
    /// Total collateral value
    #[serde(deserialize_with = "deserialize_u256")]
    pub collateral: U256,
}

impl NoteSnapshot {
    /// Debt carried by the note.
    pub fn debt(&self) -> U256 {
        self.dyad
    }
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<NotesData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct NotesData {
    notes: NotesPage,
}

#[derive(Debug, Deserialize)]
struct NotesPage {
    items: Vec<NoteSnapshot>,
}

/// GraphQL client for the note indexer.
#[derive(Debug, Clone)]
pub struct NoteSearchClient {
    client: reqwest::Client,
    endpoint: String,
}

impl NoteSearchClient {
    /// Create a client against the default indexer.
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_INDEXER_URL)
    }

    /// Create a client with a custom endpoint.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Fetch every indexed note (capped at [`SEARCH_LIMIT`]).
    #[instrument(skip(self))]
    pub async fn search(&self) -> Result<Vec<NoteSnapshot>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&GraphQlRequest { query: NOTES_QUERY })
            .send()
            .await
            .context("note search request failed")?
            .error_for_status()?;

        let body: GraphQlResponse = response.json().await?;
        let notes = parse_notes(body)?;

        info!(count = notes.len(), "Fetched indexed notes");
        Ok(notes)
    }
}

impl Default for NoteSearchClient {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_notes(body: GraphQlResponse) -> Result<Vec<NoteSnapshot>> {
    if let Some(err) = body.errors.first() {
        anyhow::bail!("indexer returned error: {}", err.message);
    }

    let data = body
        .data
        .ok_or_else(|| anyhow::anyhow!("indexer response has no data"))?;

    debug!(items = data.notes.items.len(), "Parsed notes page");
    Ok(data.notes.items)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_notes_page() {
        let json = r#"{
            "data": {
                "notes": {
                    "items": [
                        {
                            "id": "42",
                            "collatRatio": "1400000000000000000",
                            "kerosene": "0",
                            "dyad": "200000000000000000000",
                            "xp": "123",
                            "collateral": 280,
                            "__typename": "Note"
                        }
                    ],
                    "__typename": "NotePage"
                }
            }
        }"#;

        let body: GraphQlResponse = serde_json::from_str(json).unwrap();
        let notes = parse_notes(body).unwrap();

        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, "42");
        assert_eq!(notes[0].collat_ratio, U256::from(1_400_000_000_000_000_000u128));
        assert_eq!(notes[0].debt(), U256::from(200_000_000_000_000_000_000u128));
        assert_eq!(notes[0].collateral, U256::from(280u64));
    }

    #[test]
    fn test_max_collat_ratio_fits() {
        // Notes without debt report uint256 max as their ratio.
        let json = format!(
            r#"{{"id":"7","collatRatio":"{}","kerosene":"0","dyad":"0","xp":"0","collateral":"0"}}"#,
            U256::MAX
        );
        let note: NoteSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(note.collat_ratio, U256::MAX);
    }

    #[test]
    fn test_graphql_error_is_reported() {
        let json = r#"{"data": null, "errors": [{"message": "rate limited"}]}"#;
        let body: GraphQlResponse = serde_json::from_str(json).unwrap();
        let err = parse_notes(body).unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[tokio::test]
    #[ignore] // Requires network
    async fn test_live_search() {
        let client = NoteSearchClient::new();
        let notes = client.search().await.unwrap();
        assert!(notes.len() <= SEARCH_LIMIT);
    }
}
