//! Process environment: endpoints, note ids and keys.

use crate::error::MonitorError;
use alloy::primitives::U256;

/// Settings read from the environment (after `.env` loading).
#[derive(Clone)]
pub struct EnvSettings {
    pub rpc_url: String,
    pub ws_url: Option<String>,
    /// Monitored notes; the first one is the primary note
    pub note_ids: Vec<String>,
    pub private_key: Option<String>,
}

impl std::fmt::Debug for EnvSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvSettings")
            .field("rpc_url", &self.rpc_url)
            .field("ws_url", &self.ws_url)
            .field("note_ids", &self.note_ids)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl EnvSettings {
    /// Read `ALCHEMY_RPC_URL`, `ALCHEMY_WS_URL`, `NOTE_IDS` and `PRIVATE_KEY`.
    pub fn from_env() -> Result<Self, MonitorError> {
        let rpc_url = non_empty("ALCHEMY_RPC_URL").ok_or(MonitorError::MissingEnv("ALCHEMY_RPC_URL"))?;
        let note_ids = parse_note_ids(&non_empty("NOTE_IDS").unwrap_or_default())?;

        Ok(Self {
            rpc_url,
            ws_url: non_empty("ALCHEMY_WS_URL"),
            note_ids,
            private_key: non_empty("PRIVATE_KEY"),
        })
    }

    /// The note the daily report and liquidation proceeds are tied to.
    pub fn primary_note(&self) -> &str {
        // parse_note_ids guarantees at least one id
        self.note_ids.first().map(String::as_str).unwrap_or_default()
    }
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Split a comma list of decimal note ids. At least one id is required.
pub fn parse_note_ids(raw: &str) -> Result<Vec<String>, MonitorError> {
    let ids: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect();

    if ids.is_empty() {
        return Err(MonitorError::MissingNoteIds);
    }

    for id in &ids {
        if U256::from_str_radix(id, 10).is_err() {
            return Err(MonitorError::InvalidNoteId(id.clone()));
        }
    }

    Ok(ids)
}
