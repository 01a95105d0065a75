use super::MessageSection;
use crate::u256_math::{format_number, to_f64, ASSET_PRICE_DECIMALS};
use anyhow::Result;
use async_trait::async_trait;
use note_monitor_api::{PriceAsset, PriceClient, RewardsClient, VaultYield};
use note_monitor_chain::{lp_name, NoteReader};
use std::sync::Arc;

const WEEKS_PER_YEAR: f64 = 52.0;

/// Lines for one staked LP position.
///
/// `mp` is the KERO market price and `dv` its deterministic value, both USD.
pub fn lp_position_lines(vault: &VaultYield, mp: f64, dv: f64) -> Vec<String> {
    let name = lp_name(&vault.lp_token).unwrap_or(vault.lp_token.as_str());
    let per_week = vault.kerosene_per_year / WEEKS_PER_YEAR;
    let mp_apr = vault.kerosene_per_year * mp / vault.note_liquidity;
    let dv_apr = vault.kerosene_per_year * dv / vault.note_liquidity;

    vec![
        "---".to_string(),
        format!("LP: {name}"),
        format!("Liquidity: {}", format_number(vault.note_liquidity, 0)),
        format!(
            "KERO/week: {} (${}/${})",
            format_number(per_week, 0),
            format_number(per_week * mp, 2),
            format_number(per_week * dv, 2)
        ),
        format!("MP-APR: {}%", format_number(mp_apr * 100.0, 2)),
        format!("DV-APR: {}%", format_number(dv_apr * 100.0, 2)),
    ]
}

/// Weekly KERO emissions and APRs for each LP the note has staked.
pub struct LpPositionSection {
    reader: Arc<NoteReader>,
    rewards: Arc<RewardsClient>,
    prices: Arc<PriceClient>,
}

impl LpPositionSection {
    pub fn new(reader: Arc<NoteReader>, rewards: Arc<RewardsClient>, prices: Arc<PriceClient>) -> Self {
        Self {
            reader,
            rewards,
            prices,
        }
    }
}

#[async_trait]
impl MessageSection for LpPositionSection {
    fn name(&self) -> &'static str {
        "lp position"
    }

    async fn lines(&self, note_id: &str, _allow_claim: bool) -> Result<Vec<String>> {
        let (yields, asset_price, mp) = tokio::join!(
            self.rewards.fetch_yields(note_id),
            self.reader.kerosene_asset_price(),
            self.prices.price(PriceAsset::Kerosene)
        );
        let yields = yields?;
        let dv = to_f64(asset_price?, ASSET_PRICE_DECIMALS);

        Ok(yields
            .active_vaults()
            .flat_map(|vault| lp_position_lines(vault, mp, dv))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use note_monitor_chain::LP_POOLS;

    #[test]
    fn test_position_lines() {
        let (pool, name) = LP_POOLS[0];
        let vault = VaultYield {
            lp_token: pool.to_string(),
            note_liquidity: 10_000.0,
            kerosene_per_year: 52_000.0,
            note_xp: None,
        };

        let lines = lp_position_lines(&vault, 0.05, 0.04);
        assert_eq!(
            lines,
            vec![
                "---".to_string(),
                format!("LP: {name}"),
                "Liquidity: 10000".to_string(),
                "KERO/week: 1000 ($50/$40)".to_string(),
                "MP-APR: 26%".to_string(),
                "DV-APR: 20.8%".to_string(),
            ]
        );
    }

    #[test]
    fn test_unknown_lp_shows_token() {
        let vault = VaultYield {
            lp_token: "0xabc".to_string(),
            note_liquidity: 1.0,
            kerosene_per_year: 0.0,
            note_xp: None,
        };
        assert_eq!(lp_position_lines(&vault, 1.0, 1.0)[1], "LP: 0xabc");
    }
}
