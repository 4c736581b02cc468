use std::str::FromStr;

use alloy::primitives::utils::{format_units, parse_units, ParseUnits};
use alloy::primitives::{Address, U256};

use crate::error::VaultError;

/// Decimals used by both the ZENITH token and sZENITH shares.
pub const TOKEN_DECIMALS: u8 = 18;

/// Parse an address from string, with better error messages
pub fn parse_address(s: &str) -> anyhow::Result<Address> {
    Address::from_str(s.trim()).map_err(|e| anyhow::anyhow!("Invalid address {}: {}", s, e))
}

/// Parse a user-entered decimal amount into base units.
///
/// Rejects empty, negative, zero and over-precise inputs.
pub fn parse_token_amount(s: &str, decimals: u8) -> Result<U256, VaultError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(VaultError::InvalidAmount("amount is empty".to_string()));
    }
    if trimmed.starts_with('-') {
        return Err(VaultError::InvalidAmount(format!("{} is negative", trimmed)));
    }

    let parsed = parse_units(trimmed, decimals)
        .map_err(|e| VaultError::InvalidAmount(format!("{}: {}", trimmed, e)))?;

    let amount = match parsed {
        ParseUnits::U256(value) => value,
        ParseUnits::I256(_) => {
            return Err(VaultError::InvalidAmount(format!("{} is negative", trimmed)));
        }
    };

    crate::error::ensure_positive(amount)
}

/// Format base units as a decimal string with `precision` fractional digits.
pub fn format_token_amount(amount: U256, decimals: u8, precision: usize) -> String {
    format!("{:.*}", precision, to_display_f64(amount, decimals))
}

/// Lossy conversion of base units to a float, for display and ratios only.
pub fn to_display_f64(amount: U256, decimals: u8) -> f64 {
    format_units(amount, decimals)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Format an address for display (truncated)
pub fn format_address(address: &Address) -> String {
    let s = address.to_checksum(None);
    format!("{}...{}", &s[..6], &s[s.len() - 4..])
}
