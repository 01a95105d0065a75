//! Liquidation sweep.
//!
//! Candidates come from the indexer snapshot, are pre-filtered on raw
//! 1e18-scaled values and re-validated against the chain before alerting.

use crate::config::LiquidationThresholds;
use crate::traits::{CandidateSearch, ChainReader};
use crate::u256_math::format_wad;
use alloy::primitives::U256;
use note_monitor_api::NoteSnapshot;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// A pre-filtered note with its on-chain ratio and exogenous collateral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidationCandidate {
    pub note: NoteSnapshot,
    pub actual_cr: U256,
    pub exo_value: U256,
}

impl LiquidationCandidate {
    /// Below the alert ratio with exogenous collateral covering the debt.
    pub fn is_alert(&self, alert_cr: U256) -> bool {
        self.actual_cr < alert_cr && self.exo_value > self.note.debt()
    }

    pub fn alert_message(&self) -> String {
        [
            "🚨 Liquidation Opportunity 🚨".to_string(),
            format!("Note ID: {}", self.note.id),
            format!("CR: {}", format_wad(self.actual_cr)),
            format!("DYAD: {}", format_wad(self.note.debt())),
            format!("Exo Value: {} USD", format_wad(self.exo_value)),
        ]
        .join("\n")
    }
}

/// Keep notes under the pre-filter ratio carrying at least the minimum debt,
/// riskiest first. Ties keep their indexer order.
pub fn select_candidates(notes: Vec<NoteSnapshot>, thresholds: &LiquidationThresholds) -> Vec<NoteSnapshot> {
    let mut selected: Vec<NoteSnapshot> = notes
        .into_iter()
        .filter(|n| n.collat_ratio < thresholds.pre_filter_cr && n.debt() >= thresholds.min_debt)
        .collect();
    selected.sort_by_key(|n| n.collat_ratio);
    selected
}

/// Stateless-per-call liquidation monitor.
pub struct LiquidationMonitor {
    search: Arc<dyn CandidateSearch>,
    reader: Arc<dyn ChainReader>,
    thresholds: LiquidationThresholds,
}

impl LiquidationMonitor {
    pub fn new(search: Arc<dyn CandidateSearch>, reader: Arc<dyn ChainReader>, thresholds: LiquidationThresholds) -> Self {
        Self {
            search,
            reader,
            thresholds,
        }
    }

    /// One pass: search, filter, re-validate, alert.
    #[instrument(skip(self))]
    pub async fn sweep(&self) -> Vec<String> {
        info!("Checking for liquidatable notes");

        let notes = match self.search.search().await {
            Ok(notes) => notes,
            Err(e) => {
                error!(error = %e, "Candidate search failed");
                return vec![format!("Error fetching liquidatable notes: {e}")];
            }
        };

        let candidates = select_candidates(notes, &self.thresholds);
        if candidates.is_empty() {
            info!("No liquidatable notes found");
            return Vec::new();
        }
        info!(count = candidates.len(), "Found potentially liquidatable notes");

        let mut messages = Vec::new();
        for note in candidates {
            let Some(candidate) = self.validate(note).await else {
                continue;
            };

            debug!(
                note_id = %candidate.note.id,
                cr = %format_wad(candidate.actual_cr),
                dyad = %format_wad(candidate.note.debt()),
                exo_value = %format_wad(candidate.exo_value),
                "Re-checked candidate"
            );

            if candidate.is_alert(self.thresholds.alert_cr) {
                messages.push(candidate.alert_message());
            }
        }

        messages
    }

    async fn validate(&self, note: NoteSnapshot) -> Option<LiquidationCandidate> {
        let (values, cr) = tokio::join!(
            self.reader.vault_values(&note.id),
            self.reader.collateral_ratio(&note.id)
        );

        match (values, cr) {
            (Ok((exo_value, _kero_value)), Ok(actual_cr)) => Some(LiquidationCandidate {
                note,
                actual_cr,
                exo_value,
            }),
            (Err(e), _) | (_, Err(e)) => {
                warn!(note_id = %note.id, error = %e, "Failed to read candidate values, skipping");
                None
            }
        }
    }
}
