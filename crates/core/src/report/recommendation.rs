use super::{MessageSection, RiskAssessment};
use anyhow::Result;
use async_trait::async_trait;
use note_monitor_chain::{parse_note_id, NoteReader};
use std::sync::Arc;

/// Burn or mint advice that moves the note back to the target CR.
pub struct RecommendationSection {
    reader: Arc<NoteReader>,
}

impl RecommendationSection {
    pub fn new(reader: Arc<NoteReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl MessageSection for RecommendationSection {
    fn name(&self) -> &'static str {
        "recommendation"
    }

    async fn lines(&self, note_id: &str, _allow_claim: bool) -> Result<Vec<String>> {
        let id = parse_note_id(note_id)?;
        let (cr, total_value, minted) = tokio::join!(
            self.reader.collateral_ratio(id),
            self.reader.total_value(id),
            self.reader.minted_dyad(id)
        );

        Ok(RiskAssessment::from_values(cr?, total_value?, minted?).lines())
    }
}
