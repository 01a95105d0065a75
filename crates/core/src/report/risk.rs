use super::MessageSection;
use crate::u256_math::{format_number, wad_to_f64};
use alloy::primitives::U256;
use anyhow::Result;
use async_trait::async_trait;
use note_monitor_chain::{parse_note_id, NoteReader};
use std::sync::Arc;

/// Below this CR the report recommends burning.
pub const CR_LOWER: f64 = 2.5;
/// CR the recommendation aims for.
pub const CR_TARGET: f64 = 2.75;
/// Above this CR the report recommends minting.
pub const CR_UPPER: f64 = 3.0;

/// CR band of a note and the DYAD delta that brings it back to target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RiskAssessment {
    Burn(f64),
    Mint(f64),
    Hold,
}

impl RiskAssessment {
    /// Classify from raw on-chain values (all 1e18-scaled).
    pub fn from_values(cr: U256, total_value: U256, minted: U256) -> Self {
        let cr = round_cr(cr);
        let target_debt = wad_to_f64(total_value) / CR_TARGET;
        let minted = wad_to_f64(minted);

        if cr < CR_LOWER {
            Self::Burn(minted - target_debt)
        } else if cr > CR_UPPER {
            Self::Mint(target_debt - minted)
        } else {
            Self::Hold
        }
    }

    /// Report lines, empty when holding.
    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Burn(amount) => vec![
                "---".to_string(),
                format!("Recommendation: Burn {} DYAD", format_number(*amount, 0)),
            ],
            Self::Mint(amount) => vec![
                "---".to_string(),
                format!("Recommendation: Mint {} DYAD", format_number(*amount, 0)),
            ],
            Self::Hold => Vec::new(),
        }
    }
}

/// CR as displayed: 3 decimal places.
fn round_cr(cr: U256) -> f64 {
    (wad_to_f64(cr) * 1000.0).round() / 1000.0
}

/// `CR: {ratio}` rounded to three decimals.
pub struct RiskSection {
    reader: Arc<NoteReader>,
}

impl RiskSection {
    pub fn new(reader: Arc<NoteReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl MessageSection for RiskSection {
    fn name(&self) -> &'static str {
        "risk"
    }

    async fn lines(&self, note_id: &str, _allow_claim: bool) -> Result<Vec<String>> {
        let cr = self.reader.collateral_ratio(parse_note_id(note_id)?).await?;
        Ok(vec![format!("CR: {}", format_number(wad_to_f64(cr), 3))])
    }
}
