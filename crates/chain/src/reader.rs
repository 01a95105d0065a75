//! Read-only chain access for note state.
//! Uses Alloy providers for type-safe RPC interactions.

use crate::addresses::{DYAD, DYAD_LP_STAKING_FACTORY, KEROSENE_VAULT, VAULT_MANAGER};
use crate::contracts::{
    ICurveStableSwapNG, IDyad, IDyadLPStakingFactory, IERC20, IKeroseneVault, IVault,
    IVaultManager,
};
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

/// Exogenous and kerosene collateral values of a note (1e18 USD).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultValues {
    pub exo_value: U256,
    pub kero_value: U256,
}

/// USD value of one vault position.
#[derive(Debug, Clone)]
pub struct VaultPosition {
    pub vault: Address,
    pub symbol: String,
    pub usd_value: U256,
}

/// Coin balances of a two-sided pool.
#[derive(Debug, Clone)]
pub struct PoolBalances {
    pub pool: Address,
    pub symbols: Vec<String>,
    pub balances: Vec<U256>,
}

/// Head of the latest block.
#[derive(Debug, Clone, Copy)]
pub struct BlockInfo {
    pub number: u64,
    pub timestamp: u64,
}

/// Reader for note, vault and pool state.
#[derive(Clone)]
pub struct NoteReader {
    provider: DynProvider,
    rpc_url: String,
}

impl std::fmt::Debug for NoteReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteReader").field("rpc_url", &self.rpc_url).finish()
    }
}

impl NoteReader {
    /// Create a reader without touching the network.
    pub fn new(rpc_url: &str) -> Result<Self> {
        let provider = ProviderBuilder::new()
            .on_http(rpc_url.parse().context("invalid RPC URL")?)
            .erased();

        Ok(Self {
            provider,
            rpc_url: rpc_url.to_string(),
        })
    }

    /// Create a reader and verify the endpoint answers.
    pub async fn connect(rpc_url: &str) -> Result<Self> {
        let reader = Self::new(rpc_url)?;
        let block = reader.provider.get_block_number().await?;
        info!(block, "Provider connection verified");
        Ok(reader)
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    /// Collateral ratio of a note (1e18-scaled; `U256::MAX` without debt).
    #[instrument(skip(self), fields(note_id = %id))]
    pub async fn collateral_ratio(&self, id: U256) -> Result<U256> {
        let manager = IVaultManager::new(VAULT_MANAGER, &self.provider);
        let cr = manager.collatRatio(id).call().await?._0;
        debug!(cr = %cr, "Read collateral ratio");
        Ok(cr)
    }

    /// Total collateral value of a note (1e18 USD).
    pub async fn total_value(&self, id: U256) -> Result<U256> {
        let manager = IVaultManager::new(VAULT_MANAGER, &self.provider);
        Ok(manager.getTotalValue(id).call().await?._0)
    }

    /// Exogenous and kerosene collateral values.
    #[instrument(skip(self), fields(note_id = %id))]
    pub async fn vault_values(&self, id: U256) -> Result<VaultValues> {
        let manager = IVaultManager::new(VAULT_MANAGER, &self.provider);
        let values = manager.getVaultsValues(id).call().await?;
        Ok(VaultValues {
            exo_value: values.exoValue,
            kero_value: values.keroValue,
        })
    }

    /// DYAD minted against a note.
    pub async fn minted_dyad(&self, id: U256) -> Result<U256> {
        let dyad = IDyad::new(DYAD, &self.provider);
        Ok(dyad.mintedDyad(id).call().await?._0)
    }

    /// Per-vault USD value of a note's deposits.
    pub async fn vault_positions(&self, id: U256) -> Result<Vec<VaultPosition>> {
        let manager = IVaultManager::new(VAULT_MANAGER, &self.provider);
        let vaults = manager.getVaults(id).call().await?._0;

        let mut positions = Vec::with_capacity(vaults.len());
        for vault in vaults {
            let contract = IVault::new(vault, &self.provider);
            let asset_call = contract.asset();
            let usd_value_call = contract.getUsdValue(id);
            let (asset, usd_value) = tokio::join!(asset_call.call(), usd_value_call.call());
            let asset = asset?._0;
            let symbol = self.symbol(asset).await?;
            positions.push(VaultPosition {
                vault,
                symbol,
                usd_value: usd_value?._0,
            });
        }
        Ok(positions)
    }

    /// Deterministic kerosene price from the vault (8 decimals).
    pub async fn kerosene_asset_price(&self) -> Result<U256> {
        let vault = IKeroseneVault::new(KEROSENE_VAULT, &self.provider);
        Ok(vault.assetPrice().call().await?._0)
    }

    /// KERO already claimed by a note.
    pub async fn total_claimed(&self, id: U256) -> Result<U256> {
        let factory = IDyadLPStakingFactory::new(DYAD_LP_STAKING_FACTORY, &self.provider);
        Ok(factory.noteIdToTotalClaimed(id).call().await?._0)
    }

    /// Balances and coin symbols of a Curve pool.
    pub async fn pool_balances(&self, pool: Address) -> Result<PoolBalances> {
        let curve = ICurveStableSwapNG::new(pool, &self.provider);
        let balances = curve.get_balances().call().await?._0;

        let mut symbols = Vec::with_capacity(balances.len());
        for i in 0..balances.len() {
            let coin = curve.coins(U256::from(i)).call().await?._0;
            symbols.push(self.symbol(coin).await?);
        }

        Ok(PoolBalances {
            pool,
            symbols,
            balances,
        })
    }

    /// ERC20 symbol.
    pub async fn symbol(&self, token: Address) -> Result<String> {
        let erc20 = IERC20::new(token, &self.provider);
        Ok(erc20.symbol().call().await?._0)
    }

    /// Latest block number and timestamp.
    pub async fn latest_block(&self) -> Result<BlockInfo> {
        self.block(BlockNumberOrTag::Latest).await
    }

    /// Block number and timestamp at `tag`.
    pub async fn block(&self, tag: BlockNumberOrTag) -> Result<BlockInfo> {
        let block = self
            .provider
            .get_block_by_number(tag)
            .await?
            .with_context(|| format!("block {tag} not found"))?;

        Ok(BlockInfo {
            number: block.header.number,
            timestamp: block.header.timestamp,
        })
    }

    /// Current gas price in wei.
    pub async fn gas_price(&self) -> Result<u128> {
        Ok(self.provider.get_gas_price().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_url() {
        assert!(NoteReader::new("not a url").is_err());
        assert!(NoteReader::new("http://localhost:8545").is_ok());
    }

    #[tokio::test]
    #[ignore] // Requires RPC
    async fn test_live_collateral_ratio() {
        let url = std::env::var("ALCHEMY_RPC_URL").unwrap();
        let reader = NoteReader::connect(&url).await.unwrap();
        let cr = reader.collateral_ratio(U256::from(1u64)).await.unwrap();
        assert!(cr > U256::ZERO);
    }
}
