// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain client for the confidential token contract.
//!
//! [`ChainClient`] is the narrow interface the conversion core consumes.
//! [`TokenClient`] implements it over an alloy HTTP provider with a local
//! signing wallet. Read-only calls live here; the write path (submission,
//! receipt polling, error classification) lives in `transactions.rs`.

use std::time::Duration;

use alloy::{
    dyn_abi::TypedData,
    network::EthereumWallet,
    primitives::{Address, Bytes, B256, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::{local::PrivateKeySigner, Signer},
};
use async_trait::async_trait;

use super::token::IConfidentialToken;
use super::types::*;

/// Operations consumed from the chain: contract reads, contract writes,
/// receipt confirmation and typed-data signing by the connected account.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Address of the connected (signing) account.
    fn account(&self) -> Address;

    /// Address of the confidential token contract.
    fn token_address(&self) -> Address;

    async fn block_number(&self) -> Result<u64, ChainError>;

    async fn balance_of(&self, account: Address) -> Result<U256, ChainError>;
    async fn confidential_balance_of(&self, account: Address) -> Result<Handle, ChainError>;
    async fn get_user_pending_conversions(&self, user: Address) -> Result<Vec<u64>, ChainError>;
    async fn get_conversion_info(&self, conversion_id: u64) -> Result<ConversionRecord, ChainError>;
    async fn get_conversion_handles(&self, conversion_id: u64) -> Result<Vec<Handle>, ChainError>;

    async fn prepare_convert_to_plain(&self, input: &EncryptedInput) -> Result<B256, ChainError>;
    async fn finalize_conversion(
        &self,
        handle: &Handle,
        cleartext_amount: u64,
        decryption_proof: &Bytes,
    ) -> Result<B256, ChainError>;
    async fn cancel_conversion(&self, conversion_id: u64) -> Result<B256, ChainError>;
    async fn convert_to_confidential(&self, amount: U256) -> Result<B256, ChainError>;
    async fn transfer(&self, to: Address, amount: U256) -> Result<B256, ChainError>;
    async fn confidential_transfer(&self, to: Address, input: &EncryptedInput) -> Result<B256, ChainError>;
    async fn mint(&self) -> Result<B256, ChainError>;
    async fn mint_to(&self, to: Address) -> Result<B256, ChainError>;

    /// Block until the transaction is mined and return its receipt.
    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt, ChainError>;

    /// Sign EIP-712 typed data (JSON form) with the connected account.
    ///
    /// Returns the `0x`-prefixed 65-byte signature.
    async fn sign_typed_data(&self, typed_data: &serde_json::Value) -> Result<String, ChainError>;
}

/// Connection settings for [`TokenClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub token_address: Address,
    pub receipt_timeout: Duration,
    pub receipt_poll_interval: Duration,
}

/// Alloy-backed chain client bound to one token contract and one signer.
pub struct TokenClient {
    pub(super) config: ClientConfig,
    pub(super) provider: DynProvider,
    pub(super) contract: IConfidentialToken::IConfidentialTokenInstance<DynProvider>,
    pub(super) signer: PrivateKeySigner,
}

impl TokenClient {
    /// Connect to the configured RPC endpoint and verify the chain id.
    pub async fn connect(config: ClientConfig, signer: PrivateKeySigner) -> Result<Self, ChainError> {
        let url: url::Url = config
            .rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;

        let wallet = EthereumWallet::from(signer.clone());
        let provider = ProviderBuilder::new().wallet(wallet).connect_http(url).erased();

        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        if chain_id != config.chain_id {
            return Err(ChainError::ChainMismatch {
                expected: config.chain_id,
                actual: chain_id,
            });
        }

        let contract = IConfidentialToken::new(config.token_address, provider.clone());

        tracing::info!(
            chain_id,
            token = %config.token_address,
            account = %signer.address(),
            "Connected chain client"
        );

        Ok(Self {
            config,
            provider,
            contract,
            signer,
        })
    }

    /// Create a signer from a private key (hex string, with or without 0x prefix).
    pub fn create_signer(private_key_hex: &str) -> Result<PrivateKeySigner, ChainError> {
        let key_bytes = alloy::hex::decode(private_key_hex.trim())
            .map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))?;

        PrivateKeySigner::from_slice(&key_bytes)
            .map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))
    }

    /// Read the token's fixed-point decimals from the contract.
    pub async fn decimals(&self) -> Result<u8, ChainError> {
        self.contract
            .decimals()
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))
    }
}

#[async_trait]
impl ChainClient for TokenClient {
    fn account(&self) -> Address {
        self.signer.address()
    }

    fn token_address(&self) -> Address {
        self.config.token_address
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn balance_of(&self, account: Address) -> Result<U256, ChainError> {
        self.contract
            .balanceOf(account)
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))
    }

    async fn confidential_balance_of(&self, account: Address) -> Result<Handle, ChainError> {
        let handle = self
            .contract
            .confidentialBalanceOf(account)
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;
        Ok(Handle::from(handle))
    }

    async fn get_user_pending_conversions(&self, user: Address) -> Result<Vec<u64>, ChainError> {
        let ids = self
            .contract
            .getUserPendingConversions(user)
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;

        ids.into_iter().map(conversion_id_from_u256).collect()
    }

    async fn get_conversion_info(&self, conversion_id: u64) -> Result<ConversionRecord, ChainError> {
        let info = self
            .contract
            .getConversionInfo(U256::from(conversion_id))
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;

        Ok(ConversionRecord {
            id: conversion_id,
            requester: info.requester,
            handle: Handle::from(info.handle),
            is_pending: info.isPending,
            timestamp: info.timestamp.saturating_to::<u64>(),
        })
    }

    async fn get_conversion_handles(&self, conversion_id: u64) -> Result<Vec<Handle>, ChainError> {
        let handles = self
            .contract
            .getConversionHandles(U256::from(conversion_id))
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;

        Ok(handles.into_iter().map(Handle::from).collect())
    }

    async fn prepare_convert_to_plain(&self, input: &EncryptedInput) -> Result<B256, ChainError> {
        self.send_call(IConfidentialToken::prepareConvertToPlainCall {
            encryptedAmount: input.handle.to_bytes32()?,
            inputProof: input.proof.clone(),
        })
        .await
    }

    async fn finalize_conversion(
        &self,
        handle: &Handle,
        cleartext_amount: u64,
        decryption_proof: &Bytes,
    ) -> Result<B256, ChainError> {
        self.send_call(IConfidentialToken::finalizeConversionCall {
            handle: handle.to_bytes32()?,
            cleartextAmount: cleartext_amount,
            decryptionProof: decryption_proof.clone(),
        })
        .await
    }

    async fn cancel_conversion(&self, conversion_id: u64) -> Result<B256, ChainError> {
        self.send_call(IConfidentialToken::cancelConversionCall {
            conversionId: U256::from(conversion_id),
        })
        .await
    }

    async fn convert_to_confidential(&self, amount: U256) -> Result<B256, ChainError> {
        self.send_call(IConfidentialToken::convertToConfidentialCall { amount })
            .await
    }

    async fn transfer(&self, to: Address, amount: U256) -> Result<B256, ChainError> {
        self.send_call(IConfidentialToken::transferCall { to, amount })
            .await
    }

    async fn confidential_transfer(&self, to: Address, input: &EncryptedInput) -> Result<B256, ChainError> {
        self.send_call(IConfidentialToken::confidentialTransferCall {
            to,
            encryptedAmount: input.handle.to_bytes32()?,
            inputProof: input.proof.clone(),
        })
        .await
    }

    async fn mint(&self) -> Result<B256, ChainError> {
        self.send_call(IConfidentialToken::mintCall {}).await
    }

    async fn mint_to(&self, to: Address) -> Result<B256, ChainError> {
        self.send_call(IConfidentialToken::mintToCall { to }).await
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt, ChainError> {
        self.poll_receipt(tx_hash).await
    }

    async fn sign_typed_data(&self, typed_data: &serde_json::Value) -> Result<String, ChainError> {
        let typed: TypedData = serde_json::from_value(typed_data.clone())
            .map_err(|e| ChainError::Signing(format!("Invalid EIP-712 payload: {e}")))?;

        let signature = self
            .signer
            .sign_dynamic_typed_data(&typed)
            .await
            .map_err(|e| ChainError::Signing(e.to_string()))?;

        Ok(alloy::hex::encode_prefixed(signature.as_bytes()))
    }
}

fn conversion_id_from_u256(id: U256) -> Result<u64, ChainError> {
    u64::try_from(id).map_err(|_| ChainError::Contract(format!("Conversion id out of range: {id}")))
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid ciphertext handle: {0}")]
    InvalidHandle(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Chain id mismatch: expected {expected}, connected to {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Transaction rejected by signer: {0}")]
    Rejected(String),

    #[error("Transaction reverted: {0}")]
    Reverted(String),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Timed out waiting for receipt of {0}")]
    ReceiptTimeout(String),

    #[error("Conversion event not found in receipt")]
    EventNotFound,

    #[error("Signing failed: {0}")]
    Signing(String),
}
