// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! FHE encryption adapter.
//!
//! The conversion core never touches ciphertexts itself. It asks an
//! [`EncryptionAdapter`] to encrypt a 64-bit amount for a contract call, to
//! publicly decrypt an on-chain handle (with a proof the contract can
//! verify), and to privately decrypt the user's balance handle.
//!
//! Private decryption comes in two flavours, reported once by
//! [`EncryptionAdapter::decrypt_capability`]:
//!
//! - [`DecryptCapability::Direct`]: a single `user_decrypt` call.
//! - [`DecryptCapability::SignedGrant`]: generate a keypair, build an EIP-712
//!   grant, have the wallet sign it, then call `user_decrypt_with_grant`.

pub mod http;

use std::collections::BTreeMap;

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::blockchain::{EncryptedInput, Handle};

pub use http::HttpRelayer;

/// How the adapter performs authenticated private decryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecryptCapability {
    Direct,
    SignedGrant,
}

/// A decrypted plaintext value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClearValue {
    Bool(bool),
    Uint(U256),
}

/// Result of a public decryption request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicDecryption {
    /// Plaintexts keyed by handle, in whatever textual form the relayer used.
    pub clear_values: BTreeMap<String, ClearValue>,
    /// Proof to pass to the contract alongside the plaintext.
    pub decryption_proof: Bytes,
}

/// Ephemeral keypair for a signed user-decryption grant.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptionKeypair {
    pub public_key: String,
    pub private_key: String,
}

/// Parameters of the EIP-712 grant the wallet signs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantRequest {
    pub public_key: String,
    pub contract_addresses: Vec<Address>,
    pub start_timestamp: String,
    pub duration_days: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleContractPair {
    pub handle: Handle,
    pub contract_address: Address,
}

/// A user-decryption request authorised by a signed grant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUserDecrypt {
    pub handle_contract_pairs: Vec<HandleContractPair>,
    pub private_key: String,
    pub public_key: String,
    /// Signature hex without the `0x` prefix.
    pub signature: String,
    pub contract_addresses: Vec<Address>,
    pub user_address: Address,
    pub start_timestamp: String,
    pub duration_days: String,
}

#[async_trait]
pub trait EncryptionAdapter: Send + Sync {
    /// Encrypt `value` as a 64-bit input bound to `contract` and `user`.
    async fn encrypt_u64(
        &self,
        contract: Address,
        user: Address,
        value: u64,
    ) -> Result<EncryptedInput, RelayerError>;

    /// Publicly decrypt `handles`, returning plaintexts and a proof.
    async fn public_decrypt(&self, handles: &[Handle]) -> Result<PublicDecryption, RelayerError>;

    fn decrypt_capability(&self) -> DecryptCapability;

    /// Single-call private decryption. Only for [`DecryptCapability::Direct`].
    async fn user_decrypt(&self, _handle: &Handle, _contract: Address) -> Result<U256, RelayerError> {
        Err(RelayerError::Unsupported("direct user decryption"))
    }

    async fn generate_keypair(&self) -> Result<DecryptionKeypair, RelayerError> {
        Err(RelayerError::Unsupported("keypair generation"))
    }

    /// Build the EIP-712 typed data (JSON) for a decryption grant.
    async fn create_eip712(&self, _request: &GrantRequest) -> Result<serde_json::Value, RelayerError> {
        Err(RelayerError::Unsupported("EIP-712 grant construction"))
    }

    async fn user_decrypt_with_grant(
        &self,
        _request: &SignedUserDecrypt,
    ) -> Result<BTreeMap<String, ClearValue>, RelayerError> {
        Err(RelayerError::Unsupported("signed-grant user decryption"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayerError {
    #[error("Relayer configuration invalid: {0}")]
    Config(String),

    #[error("Relayer request failed: {0}")]
    Request(String),

    #[error("Relayer returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Relayer response was invalid: {0}")]
    InvalidResponse(String),

    #[error("Relayer does not support {0}")]
    Unsupported(&'static str),
}
