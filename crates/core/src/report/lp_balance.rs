use super::MessageSection;
use crate::u256_math::{format_number, wad_to_f64};
use anyhow::Result;
use async_trait::async_trait;
use note_monitor_chain::{NoteReader, PoolBalances, LP_POOLS};
use std::sync::Arc;
use tracing::{debug, warn};

const IMBALANCE_HIGH: f64 = 1.1;
const IMBALANCE_LOW: f64 = 0.9;

/// Lines for one pool, or `None` if the pool has fewer than two coins.
pub fn pool_balance_lines(name: &str, pool: &PoolBalances) -> Option<Vec<String>> {
    let [bal0, bal1, ..] = pool.balances.as_slice() else {
        return None;
    };
    let [sym0, sym1, ..] = pool.symbols.as_slice() else {
        return None;
    };
    let (v0, v1) = (wad_to_f64(*bal0), wad_to_f64(*bal1));

    let comparison = if v0 == 0.0 && v1 == 0.0 {
        "Pool has roughly equal amounts of both assets".to_string()
    } else if v1 == 0.0 {
        format!("Pool holds no {sym1}")
    } else if v0 == 0.0 {
        format!("Pool holds no {sym0}")
    } else {
        let ratio = v0 / v1;
        if ratio > IMBALANCE_HIGH {
            format!("Pool has {}x more {sym0} than {sym1}", format_number(ratio, 2))
        } else if ratio < IMBALANCE_LOW {
            format!("Pool has {}x more {sym1} than {sym0}", format_number(1.0 / ratio, 2))
        } else {
            "Pool has roughly equal amounts of both assets".to_string()
        }
    };

    Some(vec![
        format!("LP: {name}"),
        format!("{sym0}: {}", format_number(v0, 2)),
        format!("{sym1}: {}", format_number(v1, 2)),
        comparison,
        "---".to_string(),
    ])
}

/// Coin balances of the DYAD Curve pools. Not note specific.
///
/// Read failures are reported as a line instead of failing the report.
pub struct LpBalanceSection {
    reader: Arc<NoteReader>,
}

impl LpBalanceSection {
    pub fn new(reader: Arc<NoteReader>) -> Self {
        Self { reader }
    }

    async fn pool_lines(&self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        for (pool, name) in LP_POOLS {
            let balances = self.reader.pool_balances(pool).await?;
            debug!(pool = name, balances = ?balances.balances, "LP balances");
            if let Some(pool_lines) = pool_balance_lines(name, &balances) {
                lines.extend(pool_lines);
            }
        }
        Ok(lines)
    }
}

#[async_trait]
impl MessageSection for LpBalanceSection {
    fn name(&self) -> &'static str {
        "lp balance"
    }

    async fn lines(&self, _note_id: &str, _allow_claim: bool) -> Result<Vec<String>> {
        let mut lines = vec!["--- LP Balances ---".to_string()];
        match self.pool_lines().await {
            Ok(pools) if pools.is_empty() => lines.push("No LP balances found".to_string()),
            Ok(pools) => lines.extend(pools),
            Err(e) => {
                warn!(error = %e, "LP balance read failed");
                lines.push(format!("Error fetching LP balances: {e}"));
            }
        }
        Ok(lines)
    }
}
