//! Transaction signer and sender for operator actions.
//! Uses Alloy providers for type-safe RPC interactions.

use crate::addresses::{DYAD_LP_STAKING_FACTORY, VAULT_MANAGER};
use crate::contracts::{IDyadLPStakingFactory, IVaultManager};
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Headroom applied to gas estimates, in percent.
const GAS_LIMIT_HEADROOM_PCT: u64 = 20;

/// Locally tracked nonce.
pub struct NonceManager {
    current: AtomicU64,
}

impl NonceManager {
    pub fn new(initial_nonce: u64) -> Self {
        Self {
            current: AtomicU64::new(initial_nonce),
        }
    }

    /// Get next nonce and increment counter.
    #[inline]
    pub fn next(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst)
    }

    #[inline]
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Reset nonce to chain value (use after tx failure).
    pub fn reset(&self, chain_nonce: u64) {
        self.current.store(chain_nonce, Ordering::SeqCst);
    }
}

/// Gas estimate for a call together with the price it was quoted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasQuote {
    pub gas: u64,
    pub gas_price: u128,
}

impl GasQuote {
    /// Total cost in wei.
    pub fn cost_wei(&self) -> U256 {
        U256::from(self.gas) * U256::from(self.gas_price)
    }
}

/// Signs and sends note manager and staking factory transactions.
pub struct TransactionSender {
    rpc_url: String,
    wallet: EthereumWallet,
    /// Signer address
    pub address: Address,
    chain_id: u64,
    nonce_manager: NonceManager,
}

impl std::fmt::Debug for TransactionSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionSender")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("nonce", &self.nonce_manager.current())
            .finish()
    }
}

impl TransactionSender {
    /// Create a sender from a private key (with or without `0x`).
    pub async fn new(private_key: &str, rpc_url: &str) -> Result<Self> {
        let key_str = private_key.trim().trim_start_matches("0x");
        let signer: PrivateKeySigner = key_str.parse().context("invalid private key")?;
        let address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let provider = ProviderBuilder::new().on_http(rpc_url.parse()?);
        let (nonce, chain_id) = tokio::join!(
            provider.get_transaction_count(address),
            provider.get_chain_id()
        );
        let initial_nonce = nonce?;
        let chain_id = chain_id?;

        info!(
            address = %address,
            chain_id,
            initial_nonce,
            "Transaction sender initialized"
        );

        Ok(Self {
            rpc_url: rpc_url.to_string(),
            wallet,
            address,
            chain_id,
            nonce_manager: NonceManager::new(initial_nonce),
        })
    }

    /// Mint DYAD against `id` to the signer.
    pub async fn mint_dyad(&self, id: U256, amount: U256) -> Result<B256> {
        info!(note_id = %id, amount = %amount, "Minting DYAD");
        let call = IVaultManager::mintDyadCall {
            id,
            amount,
            to: self.address,
        };
        self.send_call(VAULT_MANAGER, call.abi_encode().into()).await
    }

    /// Burn DYAD to repay the debt of `id`.
    pub async fn burn_dyad(&self, id: U256, amount: U256) -> Result<B256> {
        info!(note_id = %id, amount = %amount, "Burning DYAD");
        let call = IVaultManager::burnDyadCall { id, amount };
        self.send_call(VAULT_MANAGER, call.abi_encode().into()).await
    }

    /// Withdraw `amount` of a vault's asset to the signer.
    pub async fn withdraw(&self, id: U256, vault: Address, amount: U256) -> Result<B256> {
        info!(note_id = %id, vault = %vault, amount = %amount, "Withdrawing collateral");
        let call = IVaultManager::withdrawCall {
            id,
            vault,
            amount,
            to: self.address,
        };
        self.send_call(VAULT_MANAGER, call.abi_encode().into()).await
    }

    /// Liquidate `amount` of `id`'s debt, moving collateral to note `to`.
    pub async fn liquidate(&self, id: U256, to: U256, amount: U256) -> Result<B256> {
        info!(note_id = %id, to = %to, amount = %amount, "Liquidating note");
        let call = IVaultManager::liquidateCall { id, to, amount };
        self.send_call(VAULT_MANAGER, call.abi_encode().into()).await
    }

    /// Claim merkle KERO rewards into the note's kerosene vault.
    pub async fn claim_to_vault(&self, id: U256, amount: U256, proof: Vec<B256>) -> Result<B256> {
        info!(note_id = %id, amount = %amount, "Claiming rewards to vault");
        let calldata = claim_calldata(id, amount, proof);
        self.send_call(DYAD_LP_STAKING_FACTORY, calldata).await
    }

    /// Quote the gas of a reward claim at the current gas price.
    pub async fn quote_claim(&self, id: U256, amount: U256, proof: Vec<B256>) -> Result<GasQuote> {
        let calldata = claim_calldata(id, amount, proof);
        let provider = ProviderBuilder::new().on_http(self.rpc_url.parse()?);
        let tx = TransactionRequest::default()
            .with_from(self.address)
            .with_to(DYAD_LP_STAKING_FACTORY)
            .with_input(calldata);

        let (gas, gas_price) = tokio::join!(provider.estimate_gas(tx), provider.get_gas_price());
        Ok(GasQuote {
            gas: gas?,
            gas_price: gas_price?,
        })
    }

    /// Estimate, sign, send and wait for a transaction.
    pub async fn send_call(&self, to: Address, calldata: Bytes) -> Result<B256> {
        let total_start = Instant::now();
        let provider = ProviderBuilder::new()
            .wallet(self.wallet.clone())
            .on_http(self.rpc_url.parse()?);

        let estimate_req = TransactionRequest::default()
            .with_from(self.address)
            .with_to(to)
            .with_input(calldata.clone());
        let (gas, gas_price) = tokio::join!(
            provider.estimate_gas(estimate_req),
            provider.get_gas_price()
        );
        let gas_limit = with_headroom(gas.context("gas estimation failed")?);
        let gas_price = gas_price?;

        let nonce = self.nonce_manager.next();
        let tx = TransactionRequest::default()
            .with_from(self.address)
            .with_to(to)
            .with_input(calldata)
            .with_nonce(nonce)
            .with_gas_limit(gas_limit)
            .with_gas_price(gas_price)
            .with_chain_id(self.chain_id);

        debug!(to = %to, nonce, gas_limit, gas_price_gwei = gas_price / 1_000_000_000, "Sending transaction");

        let pending = match provider.send_transaction(tx).await {
            Ok(pending) => pending,
            Err(e) => {
                self.sync_nonce().await;
                return Err(e.into());
            }
        };
        let tx_hash = *pending.tx_hash();
        info!(tx_hash = %tx_hash, "Transaction submitted, waiting for confirmation");

        let receipt = pending.get_receipt().await?;
        if receipt.status() {
            info!(
                tx_hash = %tx_hash,
                block = receipt.block_number.unwrap_or(0),
                gas_used = receipt.gas_used,
                total_ms = total_start.elapsed().as_millis(),
                "Transaction confirmed"
            );
            Ok(tx_hash)
        } else {
            warn!(tx_hash = %tx_hash, "Transaction reverted, syncing nonce");
            self.sync_nonce().await;
            anyhow::bail!("Transaction reverted: {:?}", tx_hash)
        }
    }

    /// Sync nonce from chain (call on error).
    pub async fn sync_nonce(&self) {
        let url = match self.rpc_url.parse() {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Invalid RPC URL, nonce not synced");
                return;
            }
        };
        let provider = ProviderBuilder::new().on_http(url);
        match provider.get_transaction_count(self.address).await {
            Ok(chain_nonce) => {
                self.nonce_manager.reset(chain_nonce);
                debug!(nonce = chain_nonce, "Nonce synced from chain");
            }
            Err(e) => {
                warn!(error = %e, "Failed to sync nonce from chain");
            }
        }
    }
}

fn claim_calldata(id: U256, amount: U256, proof: Vec<B256>) -> Bytes {
    IDyadLPStakingFactory::claimToVaultCall {
        noteId: id,
        amount,
        proof,
    }
    .abi_encode()
    .into()
}

fn with_headroom(gas: u64) -> u64 {
    gas.saturating_add(gas.saturating_mul(GAS_LIMIT_HEADROOM_PCT) / 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_manager() {
        let nonces = NonceManager::new(5);
        assert_eq!(nonces.next(), 5);
        assert_eq!(nonces.next(), 6);
        assert_eq!(nonces.current(), 7);
        nonces.reset(3);
        assert_eq!(nonces.next(), 3);
    }

    #[test]
    fn test_gas_headroom() {
        assert_eq!(with_headroom(100_000), 120_000);
        assert_eq!(with_headroom(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_gas_quote_cost() {
        let quote = GasQuote {
            gas: 150_000,
            gas_price: 20_000_000_000,
        };
        assert_eq!(quote.cost_wei(), U256::from(3_000_000_000_000_000u64));
    }

    #[test]
    fn test_claim_calldata_selector() {
        let data = claim_calldata(U256::from(1u64), U256::from(2u64), vec![]);
        assert_eq!(data[..4], IDyadLPStakingFactory::claimToVaultCall::SELECTOR[..]);
    }
}
