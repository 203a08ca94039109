// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction submission and confirmation for the token contract.
//!
//! Submission returns as soon as the node accepts the transaction. Callers
//! record the hash, then wait for the receipt separately.

use std::time::Instant;

use alloy::{
    primitives::B256,
    providers::Provider,
    rpc::types::TransactionRequest,
    sol_types::SolCall,
};

use super::client::{ChainError, TokenClient};
use super::types::TxReceipt;

impl TokenClient {
    /// Encode `call`, send it to the token contract and return the hash.
    pub(super) async fn send_call<C: SolCall>(&self, call: C) -> Result<B256, ChainError> {
        let data = call.abi_encode();

        let tx = TransactionRequest::default()
            .from(self.signer.address())
            .to(self.config.token_address)
            .input(data.into());

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| classify_send_error(&e.to_string()))?;

        let tx_hash = *pending.tx_hash();
        tracing::info!(
            tx_hash = %tx_hash,
            function = C::SIGNATURE,
            "Submitted contract transaction"
        );
        Ok(tx_hash)
    }

    /// Poll for a receipt until it appears or the configured timeout elapses.
    pub(super) async fn poll_receipt(&self, tx_hash: B256) -> Result<TxReceipt, ChainError> {
        let started = Instant::now();

        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(|e| ChainError::Rpc(format!("Failed to get receipt: {}", e)))?;

            if let Some(r) = receipt {
                let receipt = TxReceipt {
                    tx_hash,
                    block_number: r.block_number,
                    success: r.status(),
                    logs: r.inner.logs().iter().map(|l| l.inner.clone()).collect(),
                };
                tracing::debug!(
                    tx_hash = %tx_hash,
                    block = ?receipt.block_number,
                    success = receipt.success,
                    "Transaction confirmed"
                );
                return Ok(receipt);
            }

            if started.elapsed() >= self.config.receipt_timeout {
                return Err(ChainError::ReceiptTimeout(format!("{tx_hash:#x}")));
            }

            tokio::time::sleep(self.config.receipt_poll_interval).await;
        }
    }
}

/// Map a provider/signer error message onto a [`ChainError`] variant.
///
/// Wallet and node error strings are not standardised; these are the
/// substrings observed from common signers and EVM nodes.
pub fn classify_send_error(message: &str) -> ChainError {
    let lower = message.to_ascii_lowercase();

    if lower.contains("user denied")
        || lower.contains("user rejected")
        || lower.contains("denied request")
        || lower.contains("rejected request")
    {
        ChainError::Rejected(message.to_string())
    } else if lower.contains("insufficient funds") || lower.contains("insufficient balance") {
        ChainError::InsufficientFunds(message.to_string())
    } else if lower.contains("execution reverted") || lower.contains("contract execution") {
        ChainError::Reverted(message.to_string())
    } else if lower.contains("error sending request")
        || lower.contains("connection")
        || lower.contains("network")
        || lower.contains("timed out")
    {
        ChainError::Rpc(message.to_string())
    } else {
        ChainError::TransactionFailed(message.to_string())
    }
}
