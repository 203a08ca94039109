// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed-point amount parsing and formatting.

use alloy::primitives::U256;

use super::client::ChainError;

/// Parse a human-readable amount to token base units.
///
/// # Arguments
/// * `amount` - Amount as a string (e.g., "1.5")
/// * `decimals` - Number of fractional decimals of the token (6 for RHT)
///
/// # Returns
/// * `Ok(U256)` - Amount in smallest unit
/// * `Err` - If the string is not a plain non-negative decimal, has too many
///   fractional digits, or overflows
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, ChainError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(ChainError::InvalidAmount("Amount is empty".to_string()));
    }

    let parts: Vec<&str> = amount.split('.').collect();
    if parts.len() > 2 {
        return Err(ChainError::InvalidAmount("Invalid amount format".to_string()));
    }

    let whole_str = parts[0];
    let dec_str = parts.get(1).copied().unwrap_or("");
    if whole_str.is_empty() && dec_str.is_empty() {
        return Err(ChainError::InvalidAmount("Invalid amount format".to_string()));
    }
    if !whole_str.chars().chain(dec_str.chars()).all(|c| c.is_ascii_digit()) {
        return Err(ChainError::InvalidAmount(format!("Not a decimal number: {amount}")));
    }

    let whole = if whole_str.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole_str, 10)
            .map_err(|_| ChainError::InvalidAmount("Invalid whole number".to_string()))?
    };

    if dec_str.len() > decimals as usize {
        return Err(ChainError::InvalidAmount(format!(
            "Too many decimal places (max {})",
            decimals
        )));
    }
    // Pad with zeros to match decimals
    let padded = format!("{:0<width$}", dec_str, width = decimals as usize);
    let decimal_part = if padded.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(&padded, 10)
            .map_err(|_| ChainError::InvalidAmount("Invalid decimal".to_string()))?
    };

    let multiplier = U256::from(10u64).pow(U256::from(decimals));
    whole
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(decimal_part))
        .ok_or_else(|| ChainError::InvalidAmount("Amount overflow".to_string()))
}

/// Parse an amount that must be strictly positive and fit the contract's
/// `uint64` encrypted integer type.
pub fn parse_u64_amount(amount: &str, decimals: u8) -> Result<u64, ChainError> {
    let value = parse_amount(amount, decimals)?;
    if value.is_zero() {
        return Err(ChainError::InvalidAmount("Amount must be greater than zero".to_string()));
    }
    u64::try_from(value).map_err(|_| {
        ChainError::InvalidAmount(format!("Amount exceeds the 64-bit range: {amount}"))
    })
}

/// Format base units to a human-readable amount.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }
}
