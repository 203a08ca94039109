// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token operations outside the conversion flow.
//!
//! Balance reads (plain and confidential), plain-to-confidential conversion,
//! transfers and faucet mints. Writes wait for their receipt; writes that
//! change the plain balance emit [`Topic::BalanceChanged`].

use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use serde::Serialize;
use utoipa::ToSchema;

use crate::blockchain::{
    format_amount, parse_amount, parse_u64_amount, ChainClient, ChainError, Handle, TokenBalance,
    TokenConfig,
};
use crate::conversion::decrypt::{clear_u64, resolve_clear_amount};
use crate::conversion::ConversionError;
use crate::events::{NotificationBus, Topic};
use crate::relayer::{
    DecryptCapability, EncryptionAdapter, GrantRequest, HandleContractPair, SignedUserDecrypt,
};

/// Lifetime of a signed decryption grant, in days.
const GRANT_DURATION_DAYS: &str = "1";

/// Decrypted confidential balance.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConfidentialBalance {
    pub symbol: String,
    pub balance_raw: String,
    pub balance_formatted: String,
    pub decimals: u8,
    /// Ciphertext handle the balance was decrypted from.
    pub handle: Handle,
}

/// Confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TxResult {
    #[schema(value_type = String)]
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

pub struct TokenActions {
    chain: Arc<dyn ChainClient>,
    relayer: Arc<dyn EncryptionAdapter>,
    bus: Arc<NotificationBus>,
    token: TokenConfig,
    capability: DecryptCapability,
}

impl TokenActions {
    /// The relayer's decryption capability is captured here and reused for
    /// every confidential balance read.
    pub fn new(
        chain: Arc<dyn ChainClient>,
        relayer: Arc<dyn EncryptionAdapter>,
        bus: Arc<NotificationBus>,
        token: TokenConfig,
    ) -> Self {
        let capability = relayer.decrypt_capability();
        Self {
            chain,
            relayer,
            bus,
            token,
            capability,
        }
    }

    pub fn capability(&self) -> DecryptCapability {
        self.capability
    }

    pub async fn plain_balance(&self) -> Result<TokenBalance, ConversionError> {
        let raw = self.chain.balance_of(self.chain.account()).await?;
        Ok(TokenBalance {
            symbol: self.token.symbol.to_string(),
            balance_raw: raw.to_string(),
            balance_formatted: format_amount(raw, self.token.decimals),
            decimals: self.token.decimals,
            contract_address: format!("{:#x}", self.chain.token_address()),
        })
    }

    pub async fn confidential_balance(&self) -> Result<ConfidentialBalance, ConversionError> {
        let account = self.chain.account();
        let handle = self.chain.confidential_balance_of(account).await?;

        let amount = if handle.is_zero() {
            0
        } else {
            match self.capability {
                DecryptCapability::Direct => {
                    let value = self
                        .relayer
                        .user_decrypt(&handle, self.chain.token_address())
                        .await?;
                    clear_u64(value)?
                }
                DecryptCapability::SignedGrant => self.decrypt_with_grant(&handle).await?,
            }
        };

        let raw = U256::from(amount);
        Ok(ConfidentialBalance {
            symbol: self.token.symbol.to_string(),
            balance_raw: raw.to_string(),
            balance_formatted: format_amount(raw, self.token.decimals),
            decimals: self.token.decimals,
            handle,
        })
    }

    async fn decrypt_with_grant(&self, handle: &Handle) -> Result<u64, ConversionError> {
        let token = self.chain.token_address();
        let keypair = self.relayer.generate_keypair().await?;
        let start_timestamp = chrono::Utc::now().timestamp().to_string();

        let typed_data = self
            .relayer
            .create_eip712(&GrantRequest {
                public_key: keypair.public_key.clone(),
                contract_addresses: vec![token],
                start_timestamp: start_timestamp.clone(),
                duration_days: GRANT_DURATION_DAYS.to_string(),
            })
            .await?;
        let signature = self.chain.sign_typed_data(&typed_data).await?;

        let clear_values = self
            .relayer
            .user_decrypt_with_grant(&SignedUserDecrypt {
                handle_contract_pairs: vec![HandleContractPair {
                    handle: handle.clone(),
                    contract_address: token,
                }],
                private_key: keypair.private_key,
                public_key: keypair.public_key,
                signature: signature.trim_start_matches("0x").to_string(),
                contract_addresses: vec![token],
                user_address: self.chain.account(),
                start_timestamp,
                duration_days: GRANT_DURATION_DAYS.to_string(),
            })
            .await?;

        resolve_clear_amount(&clear_values, handle)
    }

    /// Move `amount` from the plain balance into the confidential balance.
    pub async fn convert_to_confidential(&self, amount: &str) -> Result<TxResult, ConversionError> {
        let value = self.positive_amount(amount)?;
        let tx_hash = self.chain.convert_to_confidential(value).await?;
        let result = self.confirm(tx_hash).await?;
        self.bus.emit(Topic::BalanceChanged);
        Ok(result)
    }

    /// Plain ERC-20 transfer.
    pub async fn transfer(&self, to: &str, amount: &str) -> Result<TxResult, ConversionError> {
        let to = parse_recipient(to)?;
        let value = self.positive_amount(amount)?;
        let tx_hash = self.chain.transfer(to, value).await?;
        let result = self.confirm(tx_hash).await?;
        self.bus.emit(Topic::BalanceChanged);
        Ok(result)
    }

    /// Encrypted transfer from the confidential balance.
    pub async fn confidential_transfer(&self, to: &str, amount: &str) -> Result<TxResult, ConversionError> {
        let to = parse_recipient(to)?;
        let value = parse_u64_amount(amount, self.token.decimals)?;
        let input = self
            .relayer
            .encrypt_u64(self.chain.token_address(), self.chain.account(), value)
            .await?;
        let tx_hash = self.chain.confidential_transfer(to, &input).await?;
        self.confirm(tx_hash).await
    }

    /// Faucet mint to the connected account, or to `to` when given.
    pub async fn mint(&self, to: Option<&str>) -> Result<TxResult, ConversionError> {
        let tx_hash = match to {
            Some(to) => self.chain.mint_to(parse_recipient(to)?).await?,
            None => self.chain.mint().await?,
        };
        self.confirm(tx_hash).await
    }

    fn positive_amount(&self, amount: &str) -> Result<U256, ConversionError> {
        let value = parse_amount(amount, self.token.decimals)?;
        if value.is_zero() {
            return Err(ConversionError::Validation(
                "Amount must be greater than zero".to_string(),
            ));
        }
        Ok(value)
    }

    async fn confirm(&self, tx_hash: B256) -> Result<TxResult, ConversionError> {
        let receipt = self.chain.wait_for_receipt(tx_hash).await?;
        if !receipt.success {
            return Err(ConversionError::ChainRevert(format!(
                "transaction {tx_hash:#x} reverted"
            )));
        }
        Ok(TxResult {
            tx_hash,
            block_number: receipt.block_number,
        })
    }
}

fn parse_recipient(to: &str) -> Result<Address, ChainError> {
    let to = to.trim();
    let address = Address::from_str(to)
        .map_err(|_| ChainError::InvalidAddress(format!("Invalid recipient address: {to}")))?;
    if address.is_zero() {
        return Err(ChainError::InvalidAddress("Recipient cannot be the zero address".to_string()));
    }
    Ok(address)
}
