use super::MessageSection;
use crate::u256_math::{format_number, format_wad, to_f64, wad_to_f64, ASSET_PRICE_DECIMALS};
use alloy::primitives::U256;
use anyhow::Result;
use async_trait::async_trait;
use note_monitor_api::{PriceAsset, PriceClient, RewardsClient};
use note_monitor_chain::{parse_note_id, NoteReader, TransactionSender};
use std::sync::Arc;
use tracing::{info, warn};

/// Claim only when gas costs less than this share of the claimable value.
pub const CLAIM_GAS_RATIO: f64 = 0.01;

/// Inputs for the claim decision, in display units.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimEstimate {
    /// Unclaimed KERO (1e18)
    pub claimable: U256,
    /// KERO market price (USD)
    pub market_price: f64,
    /// KERO deterministic value from the vault (USD)
    pub deterministic_value: f64,
    /// Gas cost of the claim (wei) and its USD value, when estimable
    pub gas: Option<(U256, f64)>,
}

impl ClaimEstimate {
    fn kerosene(&self) -> f64 {
        wad_to_f64(self.claimable)
    }

    pub fn claimable_mp(&self) -> f64 {
        self.kerosene() * self.market_price
    }

    pub fn claimable_dv(&self) -> f64 {
        self.kerosene() * self.deterministic_value
    }

    /// Gas USD over claimable market value.
    pub fn gas_share(&self) -> Option<f64> {
        self.gas.map(|(_, usd)| usd / self.claimable_mp())
    }

    pub fn decision(&self) -> ClaimDecision {
        if self.claimable.is_zero() {
            return ClaimDecision::Nothing;
        }
        match (self.gas, self.gas_share()) {
            (Some(_), Some(share)) if share > 0.0 && share < CLAIM_GAS_RATIO => ClaimDecision::Claim,
            (Some(_), _) => ClaimDecision::NotWorth,
            (None, _) => ClaimDecision::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimDecision {
    Nothing,
    Claim,
    NotWorth,
    Unknown,
}

/// Report line for an estimate, or `None` when nothing is claimable.
pub fn claim_line(estimate: &ClaimEstimate, allow_claim: bool) -> Option<String> {
    let amount = format!(
        "{} KERO (${}/${})",
        format_number(estimate.kerosene(), 0),
        format_number(estimate.claimable_mp(), 2),
        format_number(estimate.claimable_dv(), 2)
    );
    let gas = estimate
        .gas
        .map(|(wei, usd)| format!("{} ETH (${})", format_wad(wei), format_number(usd, 2)));

    let line = match (estimate.decision(), gas) {
        (ClaimDecision::Nothing, _) => return None,
        (ClaimDecision::Claim, Some(gas)) if allow_claim => format!("Claiming {amount} for {gas}"),
        (ClaimDecision::Claim, Some(gas)) => {
            format!("Claimable: {amount}, would cost {gas} gas (claim not executed)")
        }
        (_, Some(gas)) => format!("Claimable: {amount}, not worth {gas} gas"),
        (_, None) => format!("Claimable: {amount}, but gas cannot be estimated"),
    };
    Some(line)
}

/// Unclaimed LP rewards, and the claim itself when gas is cheap enough.
pub struct RewardSection {
    reader: Arc<NoteReader>,
    rewards: Arc<RewardsClient>,
    prices: Arc<PriceClient>,
    sender: Option<Arc<TransactionSender>>,
}

impl RewardSection {
    pub fn new(
        reader: Arc<NoteReader>,
        rewards: Arc<RewardsClient>,
        prices: Arc<PriceClient>,
        sender: Option<Arc<TransactionSender>>,
    ) -> Self {
        Self {
            reader,
            rewards,
            prices,
            sender,
        }
    }
}

#[async_trait]
impl MessageSection for RewardSection {
    fn name(&self) -> &'static str {
        "reward"
    }

    async fn lines(&self, note_id: &str, allow_claim: bool) -> Result<Vec<String>> {
        let id = parse_note_id(note_id)?;

        let (rewards, claimed, asset_price) = tokio::join!(
            self.rewards.fetch_rewards(note_id),
            self.reader.total_claimed(id),
            self.reader.kerosene_asset_price()
        );
        let rewards = rewards?;
        let claimable = rewards.amount.saturating_sub(claimed?);
        let market_price = self.prices.price(PriceAsset::Kerosene).await;

        let mut estimate = ClaimEstimate {
            claimable,
            market_price,
            deterministic_value: to_f64(asset_price?, ASSET_PRICE_DECIMALS),
            gas: None,
        };

        if !claimable.is_zero() {
            if let Some(sender) = &self.sender {
                match sender.quote_claim(id, rewards.amount, rewards.proof.clone()).await {
                    Ok(quote) => {
                        let cost = quote.cost_wei();
                        let eth = self.prices.price(PriceAsset::Eth).await;
                        estimate.gas = Some((cost, wad_to_f64(cost) * eth));
                    }
                    Err(e) => warn!(note = note_id, error = %e, "Claim gas estimation failed"),
                }
            }
        }

        let Some(line) = claim_line(&estimate, allow_claim) else {
            return Ok(Vec::new());
        };
        let mut lines = vec![line];

        if allow_claim && estimate.decision() == ClaimDecision::Claim {
            if let Some(sender) = &self.sender {
                match sender.claim_to_vault(id, rewards.amount, rewards.proof).await {
                    Ok(tx) => info!(note = note_id, tx = %tx, "Rewards claimed"),
                    Err(e) => {
                        warn!(note = note_id, error = %e, "Claim failed");
                        lines.push(format!("Claim failed: {e}"));
                    }
                }
            }
        }

        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::wad;

    fn estimate(kero: &str, gas: Option<(&str, f64)>) -> ClaimEstimate {
        ClaimEstimate {
            claimable: wad(kero),
            market_price: 0.05,
            deterministic_value: 0.04,
            gas: gas.map(|(eth, usd)| (wad(eth), usd)),
        }
    }

    #[test]
    fn test_nothing_claimable() {
        let e = estimate("0", Some(("0.001", 2.5)));
        assert_eq!(e.decision(), ClaimDecision::Nothing);
        assert_eq!(claim_line(&e, true), None);
    }

    #[test]
    fn test_cheap_gas_claims() {
        // 100000 KERO at $0.05 = $5000, gas $2.50 = 0.05%
        let e = estimate("100000", Some(("0.001", 2.5)));
        assert_eq!(e.decision(), ClaimDecision::Claim);
        assert_eq!(
            claim_line(&e, true).unwrap(),
            "Claiming 100000 KERO ($5000/$4000) for 0.001 ETH ($2.5)"
        );
        assert_eq!(
            claim_line(&e, false).unwrap(),
            "Claimable: 100000 KERO ($5000/$4000), would cost 0.001 ETH ($2.5) gas (claim not executed)"
        );
    }

    #[test]
    fn test_expensive_gas_skips() {
        // 1000 KERO at $0.05 = $50, gas $2.50 = 5%
        let e = estimate("1000", Some(("0.001", 2.5)));
        assert_eq!(e.decision(), ClaimDecision::NotWorth);
        assert_eq!(
            claim_line(&e, true).unwrap(),
            "Claimable: 1000 KERO ($50/$40), not worth 0.001 ETH ($2.5) gas"
        );
    }

    #[test]
    fn test_unknown_gas() {
        let e = estimate("1000", None);
        assert_eq!(e.decision(), ClaimDecision::Unknown);
        assert_eq!(
            claim_line(&e, true).unwrap(),
            "Claimable: 1000 KERO ($50/$40), but gas cannot be estimated"
        );
    }

    #[test]
    fn test_zero_price_never_claims() {
        // Price lookup failure yields 0.0, making the share infinite
        let mut e = estimate("100000", Some(("0.001", 2.5)));
        e.market_price = 0.0;
        assert_eq!(e.decision(), ClaimDecision::NotWorth);
    }
}
