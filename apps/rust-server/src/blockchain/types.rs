// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use std::str::FromStr;

use alloy::primitives::{Address, Log, B256};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::client::ChainError;

/// EVM network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
}

/// Ethereum Sepolia, where the fhEVM coprocessor and relayer are deployed.
pub const SEPOLIA: NetworkConfig = NetworkConfig {
    name: "Ethereum Sepolia",
    chain_id: 11155111,
    rpc_url: "https://ethereum-sepolia-rpc.publicnode.com",
    explorer_url: "https://sepolia.etherscan.io",
};

/// Confidential token metadata.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub symbol: &'static str,
    pub name: &'static str,
    pub decimals: u8,
}

/// RabbitHole Token (`RHT`): ERC-20 plain balance plus an FHE-encrypted
/// `euint64` confidential balance.
pub const RHT_TOKEN: TokenConfig = TokenConfig {
    symbol: "RHT",
    name: "RabbitHole Token",
    decimals: 6,
};

/// Opaque reference to an on-chain ciphertext.
///
/// Kept as the literal string it was produced with, because decryption
/// results may be keyed either by that literal or by its lower-cased form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    pub fn new(literal: impl Into<String>) -> Self {
        Self(literal.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x`-prefixed, lower-cased hex form.
    pub fn normalized(&self) -> String {
        let body = self
            .0
            .strip_prefix("0x")
            .or_else(|| self.0.strip_prefix("0X"))
            .unwrap_or(&self.0);
        format!("0x{}", body.to_ascii_lowercase())
    }

    /// An all-zero handle denotes an uninitialised (zero) ciphertext.
    pub fn is_zero(&self) -> bool {
        self.to_bytes32().map(|b| b.is_zero()).unwrap_or(false)
    }

    pub fn to_bytes32(&self) -> Result<B256, ChainError> {
        B256::from_str(&self.normalized())
            .map_err(|e| ChainError::InvalidHandle(format!("{}: {e}", self.0)))
    }
}

impl From<B256> for Handle {
    fn from(value: B256) -> Self {
        Handle(format!("{value:#x}"))
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// On-chain conversion record, as returned by `getConversionInfo`.
///
/// The contract owns this record; `is_pending` is the only lifecycle flag
/// the client relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ConversionRecord {
    pub id: u64,
    #[schema(value_type = String)]
    pub requester: Address,
    pub handle: Handle,
    pub is_pending: bool,
    /// Unix timestamp (seconds) when the conversion was requested.
    pub timestamp: u64,
}

/// Ciphertext handle and input proof produced by the relayer for a contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInput {
    pub handle: Handle,
    pub proof: alloy::primitives::Bytes,
}

/// Transaction receipt after confirmation.
#[derive(Debug, Clone)]
pub struct TxReceipt {
    /// Transaction hash
    pub tx_hash: B256,
    /// Block number where transaction was included
    pub block_number: Option<u64>,
    /// Whether the transaction was successful
    pub success: bool,
    /// Emitted event logs
    pub logs: Vec<Log>,
}

/// Plain (ERC-20) balance information.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenBalance {
    /// Token symbol
    pub symbol: String,
    /// Balance in smallest unit
    pub balance_raw: String,
    /// Balance formatted with decimals
    pub balance_formatted: String,
    /// Number of decimals
    pub decimals: u8,
    /// Token contract address
    pub contract_address: String,
}
