// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Locating a handle's plaintext in a decryption result.

use std::collections::BTreeMap;

use alloy::primitives::U256;

use super::error::ConversionError;
use crate::blockchain::Handle;
use crate::relayer::ClearValue;

/// Find the plaintext for `handle` in `clear_values`.
///
/// Lookup order: the handle's literal string, then its normalized
/// (lower-case, `0x`-prefixed) form, then any key whose normalized form
/// matches, then the only entry of a single-entry map. The value must be an
/// unsigned integer that fits in 64 bits.
pub fn resolve_clear_amount(
    clear_values: &BTreeMap<String, ClearValue>,
    handle: &Handle,
) -> Result<u64, ConversionError> {
    let value = lookup(clear_values, handle).ok_or_else(|| {
        ConversionError::Unrecoverable(format!(
            "decryption result has no value for handle {handle} ({} entries)",
            clear_values.len()
        ))
    })?;

    match value {
        ClearValue::Uint(v) => clear_u64(*v),
        ClearValue::Bool(_) => Err(ConversionError::Unrecoverable(
            "decrypted value is a boolean, expected an amount".to_string(),
        )),
    }
}

fn lookup<'a>(clear_values: &'a BTreeMap<String, ClearValue>, handle: &Handle) -> Option<&'a ClearValue> {
    if let Some(v) = clear_values.get(handle.as_str()) {
        return Some(v);
    }
    let normalized = handle.normalized();
    if let Some(v) = clear_values.get(&normalized) {
        return Some(v);
    }
    if let Some((_, v)) = clear_values.iter().find(|(k, _)| Handle::new(k.as_str()).normalized() == normalized) {
        return Some(v);
    }
    if clear_values.len() == 1 {
        tracing::warn!(handle = %handle, "Handle not found in decryption result, using single entry");
        return clear_values.values().next();
    }
    None
}

/// Narrow a decrypted amount to the contract's `uint64`.
pub fn clear_u64(value: U256) -> Result<u64, ConversionError> {
    u64::try_from(value).map_err(|_| {
        ConversionError::Unrecoverable(format!("decrypted amount {value} exceeds 64 bits"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(entries: &[(&str, ClearValue)]) -> BTreeMap<String, ClearValue> {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn uint(v: u64) -> ClearValue {
        ClearValue::Uint(U256::from(v))
    }

    #[test]
    fn exact_key_wins() {
        let map = values(&[("0xABC", uint(1)), ("0xabc", uint(2))]);
        assert_eq!(resolve_clear_amount(&map, &Handle::new("0xABC")).unwrap(), 1);
    }

    #[test]
    fn normalized_key_matches() {
        let map = values(&[("0xabc", uint(5)), ("0xdef", uint(6))]);
        assert_eq!(resolve_clear_amount(&map, &Handle::new("0xABC")).unwrap(), 5);
    }

    #[test]
    fn relayer_uppercase_key_matches_lowercase_handle() {
        let map = values(&[("0xABC", uint(5)), ("0xdef", uint(6))]);
        assert_eq!(resolve_clear_amount(&map, &Handle::new("0xabc")).unwrap(), 5);
    }

    #[test]
    fn single_entry_is_used_as_fallback() {
        let map = values(&[("0xother", uint(100_000_000))]);
        assert_eq!(resolve_clear_amount(&map, &Handle::new("0xabc")).unwrap(), 100_000_000);
    }

    #[test]
    fn multi_entry_without_match_is_unrecoverable() {
        let map = values(&[("0x01", uint(1)), ("0x02", uint(2))]);
        let err = resolve_clear_amount(&map, &Handle::new("0xabc")).unwrap_err();
        assert!(matches!(err, ConversionError::Unrecoverable(_)));
    }

    #[test]
    fn oversized_value_is_rejected() {
        let map = values(&[("0xabc", ClearValue::Uint(U256::from(u64::MAX) + U256::from(1u8)))]);
        assert!(resolve_clear_amount(&map, &Handle::new("0xabc")).is_err());

        let max = values(&[("0xabc", uint(u64::MAX))]);
        assert_eq!(resolve_clear_amount(&max, &Handle::new("0xabc")).unwrap(), u64::MAX);
    }

    #[test]
    fn boolean_value_is_rejected() {
        let map = values(&[("0xabc", ClearValue::Bool(true))]);
        assert!(resolve_clear_amount(&map, &Handle::new("0xabc")).is_err());
    }

    #[test]
    fn empty_map_is_unrecoverable() {
        assert!(resolve_clear_amount(&BTreeMap::new(), &Handle::new("0xabc")).is_err());
    }
}
