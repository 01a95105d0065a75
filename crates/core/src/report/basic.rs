use super::MessageSection;
use crate::u256_math::format_number;
use anyhow::Result;
use async_trait::async_trait;
use note_monitor_api::RewardsClient;
use std::sync::Arc;

/// `Note: {id}` and the note's XP when the yields API reports it.
pub struct BasicInfoSection {
    rewards: Arc<RewardsClient>,
}

impl BasicInfoSection {
    pub fn new(rewards: Arc<RewardsClient>) -> Self {
        Self { rewards }
    }
}

#[async_trait]
impl MessageSection for BasicInfoSection {
    fn name(&self) -> &'static str {
        "basic info"
    }

    async fn lines(&self, note_id: &str, _allow_claim: bool) -> Result<Vec<String>> {
        let mut lines = vec![format!("Note: {note_id}")];

        let yields = self.rewards.fetch_yields(note_id).await?;
        if let Some(xp) = yields.note_xp().filter(|xp| *xp != 0.0) {
            lines.push(format!("XP: {}", format_number(xp, 2)));
        }

        Ok(lines)
    }
}
