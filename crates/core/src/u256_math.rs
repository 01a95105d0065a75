//! Fixed-point helpers for 1e18-scaled protocol values.
//!
//! Comparisons stay in `U256`. Conversions to `f64` exist for display only.

use alloy::primitives::utils::parse_units;
use alloy::primitives::U256;

use crate::error::MonitorError;

/// WAD constant: 1e18 for 18-decimal fixed-point arithmetic
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000u64, 0, 0, 0]);

/// Decimals of the kerosene vault asset price.
pub const ASSET_PRICE_DECIMALS: u8 = 8;

/// Parse a decimal string ("1.75") into a 1e18-scaled integer.
pub fn parse_wad(value: &str) -> Result<U256, MonitorError> {
    let value = value.trim();
    parse_units(value, 18)
        .ok()
        .filter(|parsed| !parsed.is_negative())
        .map(|parsed| parsed.get_absolute())
        .ok_or_else(|| MonitorError::InvalidAmount(value.to_string()))
}

/// Convert a `decimals`-scaled integer to f64.
/// Use only for display/logging, not for computation.
pub fn to_f64(value: U256, decimals: u8) -> f64 {
    let mut out = 0.0f64;
    for limb in value.as_limbs().iter().rev() {
        out = out * 18_446_744_073_709_551_616.0 + *limb as f64;
    }
    out / 10f64.powi(decimals as i32)
}

/// Convert WAD (18 decimals) to f64.
#[inline(always)]
pub fn wad_to_f64(wad: U256) -> f64 {
    to_f64(wad, 18)
}

/// Render a WAD exactly, trimming trailing zeros but keeping one fractional
/// digit ("200.0", "1.3").
pub fn format_wad(wad: U256) -> String {
    let int = wad / WAD;
    let frac = (wad % WAD).to_string();
    let frac = format!("{:0>18}", frac);
    let frac = frac.trim_end_matches('0');
    let frac = if frac.is_empty() { "0" } else { frac };
    format!("{int}.{frac}")
}

/// Round to at most `decimals` places and render without trailing zeros.
pub fn format_number(value: f64, decimals: u32) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    // Avoid "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded}")
}
