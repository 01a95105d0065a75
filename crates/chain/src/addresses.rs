//! Mainnet deployment addresses.

use alloy::primitives::{address, Address, U256};
use anyhow::{Context, Result};

pub const VAULT_MANAGER: Address = address!("B62bdb1A6AC97A9B70957DD35357311e8859f0d7");
pub const KEROSENE_VAULT: Address = address!("4808e4CC6a2Ba764778A0351E1Be198494aF0b43");
pub const DYAD_LP_STAKING_FACTORY: Address = address!("D19DCbB8B82805d779a6A2182d8F4355275CC30a");
pub const DYAD: Address = address!("Fd03723a9A3AbE0562451496a9a394D2C4bad4ab");
pub const WETH_VAULT: Address = address!("4fde0131694Ae08C549118c595923CE0b42f8299");

/// Curve pools paired with DYAD, with display names.
pub const LP_POOLS: [(Address, &str); 2] = [
    (address!("a969cFCd9e583edb8c8B270Dc8CaFB33d6Cf662D"), "DYAD/wM"),
    (address!("1507bf3F8712c496fA4679a4bA827F633979dBa4"), "DYAD/USDC"),
];

/// Vault address for a withdrawable asset name.
pub fn vault_for_asset(asset: &str) -> Result<Address> {
    match asset.to_ascii_uppercase().as_str() {
        "KEROSENE" => Ok(KEROSENE_VAULT),
        "WETH" => Ok(WETH_VAULT),
        other => anyhow::bail!("unknown asset: {other}. Available assets: KEROSENE, WETH"),
    }
}

/// Display name of an LP token, if known.
pub fn lp_name(lp_token: &str) -> Option<&'static str> {
    let lp_token: Address = lp_token.parse().ok()?;
    LP_POOLS
        .iter()
        .find(|(addr, _)| *addr == lp_token)
        .map(|(_, name)| *name)
}

/// Parse a decimal note id.
pub fn parse_note_id(id: &str) -> Result<U256> {
    let id = id.trim();
    if id.is_empty() {
        anyhow::bail!("empty note id");
    }
    U256::from_str_radix(id, 10).with_context(|| format!("invalid note id: {id:?}"))
}
