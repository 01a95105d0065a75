//! Note report assembled from independent sections.
//!
//! Sections run in a fixed order and their lines are joined with `\n`.
//! A failing section fails the whole report, except LP balances which
//! report errors inline.

mod basic;
mod lp_balance;
mod lp_position;
mod recommendation;
mod reward;
mod risk;

pub use basic::BasicInfoSection;
pub use lp_balance::{pool_balance_lines, LpBalanceSection};
pub use lp_position::{lp_position_lines, LpPositionSection};
pub use recommendation::RecommendationSection;
pub use reward::{claim_line, ClaimDecision, ClaimEstimate, RewardSection, CLAIM_GAS_RATIO};
pub use risk::{RiskAssessment, RiskSection, CR_LOWER, CR_TARGET, CR_UPPER};

use crate::traits::ReportBuilder;
use anyhow::{Context, Result};
use async_trait::async_trait;
use note_monitor_api::{PriceClient, RewardsClient};
use note_monitor_chain::{NoteReader, TransactionSender};
use std::sync::Arc;
use tracing::{debug, instrument};

/// One block of report lines.
#[async_trait]
pub trait MessageSection: Send + Sync {
    fn name(&self) -> &'static str;

    async fn lines(&self, note_id: &str, allow_claim: bool) -> Result<Vec<String>>;
}

/// Runs sections in order and joins their lines.
pub struct NoteReportBuilder {
    sections: Vec<Box<dyn MessageSection>>,
}

impl NoteReportBuilder {
    pub fn new(sections: Vec<Box<dyn MessageSection>>) -> Self {
        Self { sections }
    }

    /// The standard report: basic info, risk, reward/claim, LP position,
    /// LP balances, recommendation.
    pub fn standard(
        reader: Arc<NoteReader>,
        rewards: Arc<RewardsClient>,
        prices: Arc<PriceClient>,
        sender: Option<Arc<TransactionSender>>,
    ) -> Self {
        Self::new(vec![
            Box::new(BasicInfoSection::new(rewards.clone())),
            Box::new(RiskSection::new(reader.clone())),
            Box::new(RewardSection::new(reader.clone(), rewards.clone(), prices.clone(), sender)),
            Box::new(LpPositionSection::new(reader.clone(), rewards, prices)),
            Box::new(LpBalanceSection::new(reader.clone())),
            Box::new(RecommendationSection::new(reader)),
        ])
    }

    pub fn section_names(&self) -> Vec<&'static str> {
        self.sections.iter().map(|s| s.name()).collect()
    }
}

#[async_trait]
impl ReportBuilder for NoteReportBuilder {
    #[instrument(skip(self))]
    async fn build(&self, note_id: &str, allow_claim: bool) -> Result<String> {
        let mut lines = Vec::new();
        for section in &self.sections {
            let section_lines = section
                .lines(note_id, allow_claim)
                .await
                .with_context(|| format!("{} section", section.name()))?;
            debug!(section = section.name(), lines = section_lines.len(), "Section rendered");
            lines.extend(section_lines);
        }
        Ok(lines.join("\n"))
    }
}
