// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory chain and relayer doubles for unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

use crate::blockchain::token::conversion_requested_log;
use crate::blockchain::{ChainClient, ChainError, ConversionRecord, EncryptedInput, Handle, TxReceipt};
use crate::relayer::{
    ClearValue, DecryptCapability, DecryptionKeypair, EncryptionAdapter, GrantRequest,
    PublicDecryption, RelayerError, SignedUserDecrypt,
};

pub(crate) const ACCOUNT: Address = Address::repeat_byte(0xAA);
pub(crate) const TOKEN: Address = Address::repeat_byte(0x70);

/// Failure injected into a mocked write.
#[derive(Debug, Clone, Copy)]
pub(crate) enum MockFailure {
    Rejected,
    Reverted,
    Rpc,
}

impl MockFailure {
    fn to_error(self) -> ChainError {
        match self {
            MockFailure::Rejected => ChainError::Rejected("User rejected the request.".to_string()),
            MockFailure::Reverted => ChainError::Reverted("execution reverted".to_string()),
            MockFailure::Rpc => ChainError::Rpc("connection refused".to_string()),
        }
    }
}

#[derive(Default)]
struct ChainState {
    plain_balance: U256,
    confidential_handle: Option<Handle>,
    records: BTreeMap<u64, ConversionRecord>,
    receipts: HashMap<B256, TxReceipt>,
    next_tx: u64,
    next_conversion_id: u64,
    fail_reads: bool,
    failing_records: HashSet<u64>,
    fail_prepare: Option<MockFailure>,
    fail_finalize: Option<MockFailure>,
    fail_cancel: Option<MockFailure>,
    fail_writes: Option<MockFailure>,
    revert_request: bool,
    finalized: Vec<(Handle, u64)>,
    cancelled: Vec<u64>,
    writes: Vec<String>,
    signed: Vec<serde_json::Value>,
}

pub(crate) struct MockChain {
    state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChainState {
                next_conversion_id: 1,
                ..Default::default()
            }),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut ChainState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    /// Handle emitted by the `ConversionRequested` event of every request.
    pub fn conversion_handle(&self) -> Handle {
        Handle::from(B256::repeat_byte(0xC0))
    }

    pub fn add_conversion(&self, id: u64, handle: Handle, is_pending: bool, timestamp: u64) {
        self.with(|s| {
            s.records.insert(
                id,
                ConversionRecord {
                    id,
                    requester: ACCOUNT,
                    handle,
                    is_pending,
                    timestamp,
                },
            );
        });
    }

    pub fn set_plain_balance(&self, balance: U256) {
        self.with(|s| s.plain_balance = balance);
    }

    pub fn set_confidential_handle(&self, handle: Handle) {
        self.with(|s| s.confidential_handle = Some(handle));
    }

    pub fn fail_reads(&self) {
        self.with(|s| s.fail_reads = true);
    }

    /// Fail `getConversionInfo` for a single conversion.
    pub fn fail_info_for(&self, conversion_id: u64) {
        self.with(|s| s.failing_records.insert(conversion_id));
    }

    pub fn fail_prepare(&self, failure: MockFailure) {
        self.with(|s| s.fail_prepare = Some(failure));
    }

    pub fn fail_finalize(&self, failure: MockFailure) {
        self.with(|s| s.fail_finalize = Some(failure));
    }

    pub fn fail_cancel(&self, failure: MockFailure) {
        self.with(|s| s.fail_cancel = Some(failure));
    }

    /// Make every token write (transfer, mint, ...) fail.
    pub fn fail_writes(&self, failure: MockFailure) {
        self.with(|s| s.fail_writes = Some(failure));
    }

    /// Mine the next conversion request as reverted.
    pub fn revert_request(&self) {
        self.with(|s| s.revert_request = true);
    }

    pub fn finalized(&self) -> Vec<(Handle, u64)> {
        self.with(|s| s.finalized.clone())
    }

    pub fn cancelled(&self) -> Vec<u64> {
        self.with(|s| s.cancelled.clone())
    }

    /// Descriptions of the token writes submitted so far.
    pub fn writes(&self) -> Vec<String> {
        self.with(|s| s.writes.clone())
    }

    pub fn signed_payloads(&self) -> Vec<serde_json::Value> {
        self.with(|s| s.signed.clone())
    }

    fn mine(s: &mut ChainState, success: bool, logs: Vec<alloy::primitives::Log>) -> B256 {
        s.next_tx += 1;
        let tx_hash = B256::from(U256::from(s.next_tx));
        s.receipts.insert(
            tx_hash,
            TxReceipt {
                tx_hash,
                block_number: Some(s.next_tx),
                success,
                logs,
            },
        );
        tx_hash
    }

    fn write(&self, description: String) -> Result<B256, ChainError> {
        self.with(|s| {
            if let Some(failure) = s.fail_writes {
                return Err(failure.to_error());
            }
            s.writes.push(description);
            Ok(Self::mine(s, true, Vec::new()))
        })
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn account(&self) -> Address {
        ACCOUNT
    }

    fn token_address(&self) -> Address {
        TOKEN
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        self.with(|s| {
            if s.fail_reads {
                Err(ChainError::Rpc("connection refused".to_string()))
            } else {
                Ok(s.next_tx)
            }
        })
    }

    async fn balance_of(&self, _account: Address) -> Result<U256, ChainError> {
        self.with(|s| {
            if s.fail_reads {
                Err(ChainError::Rpc("connection refused".to_string()))
            } else {
                Ok(s.plain_balance)
            }
        })
    }

    async fn confidential_balance_of(&self, _account: Address) -> Result<Handle, ChainError> {
        self.with(|s| {
            if s.fail_reads {
                return Err(ChainError::Rpc("connection refused".to_string()));
            }
            Ok(s.confidential_handle
                .clone()
                .unwrap_or_else(|| Handle::from(B256::ZERO)))
        })
    }

    async fn get_user_pending_conversions(&self, _user: Address) -> Result<Vec<u64>, ChainError> {
        self.with(|s| {
            if s.fail_reads {
                return Err(ChainError::Contract("execution reverted".to_string()));
            }
            Ok(s.records.keys().copied().collect())
        })
    }

    async fn get_conversion_info(&self, conversion_id: u64) -> Result<ConversionRecord, ChainError> {
        self.with(|s| {
            if s.fail_reads || s.failing_records.contains(&conversion_id) {
                return Err(ChainError::Contract("execution reverted".to_string()));
            }
            s.records
                .get(&conversion_id)
                .cloned()
                .ok_or_else(|| ChainError::Contract(format!("unknown conversion {conversion_id}")))
        })
    }

    async fn get_conversion_handles(&self, conversion_id: u64) -> Result<Vec<Handle>, ChainError> {
        let record = self.get_conversion_info(conversion_id).await?;
        Ok(vec![record.handle])
    }

    async fn prepare_convert_to_plain(&self, _input: &EncryptedInput) -> Result<B256, ChainError> {
        let handle = self.conversion_handle();
        self.with(|s| {
            if let Some(failure) = s.fail_prepare {
                return Err(failure.to_error());
            }
            if s.revert_request {
                return Ok(Self::mine(s, false, Vec::new()));
            }
            let id = s.next_conversion_id;
            s.next_conversion_id += 1;
            let raw_handle = handle.to_bytes32()?;
            s.records.insert(
                id,
                ConversionRecord {
                    id,
                    requester: ACCOUNT,
                    handle: handle.clone(),
                    is_pending: true,
                    timestamp: id,
                },
            );
            let log = conversion_requested_log(TOKEN, id, ACCOUNT, raw_handle);
            Ok(Self::mine(s, true, vec![log]))
        })
    }

    async fn finalize_conversion(
        &self,
        handle: &Handle,
        cleartext_amount: u64,
        _decryption_proof: &Bytes,
    ) -> Result<B256, ChainError> {
        self.with(|s| {
            if let Some(failure) = s.fail_finalize {
                return Err(failure.to_error());
            }
            for record in s.records.values_mut().filter(|r| &r.handle == handle) {
                record.is_pending = false;
            }
            s.finalized.push((handle.clone(), cleartext_amount));
            Ok(Self::mine(s, true, Vec::new()))
        })
    }

    async fn cancel_conversion(&self, conversion_id: u64) -> Result<B256, ChainError> {
        self.with(|s| {
            if let Some(failure) = s.fail_cancel {
                return Err(failure.to_error());
            }
            if let Some(record) = s.records.get_mut(&conversion_id) {
                record.is_pending = false;
            }
            s.cancelled.push(conversion_id);
            Ok(Self::mine(s, true, Vec::new()))
        })
    }

    async fn convert_to_confidential(&self, amount: U256) -> Result<B256, ChainError> {
        self.write(format!("convertToConfidential({amount})"))
    }

    async fn transfer(&self, to: Address, amount: U256) -> Result<B256, ChainError> {
        self.write(format!("transfer({to},{amount})"))
    }

    async fn confidential_transfer(&self, to: Address, input: &EncryptedInput) -> Result<B256, ChainError> {
        self.write(format!("confidentialTransfer({to},{})", input.handle))
    }

    async fn mint(&self) -> Result<B256, ChainError> {
        self.write("mint()".to_string())
    }

    async fn mint_to(&self, to: Address) -> Result<B256, ChainError> {
        self.write(format!("mintTo({to})"))
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt, ChainError> {
        self.with(|s| {
            s.receipts
                .get(&tx_hash)
                .cloned()
                .ok_or_else(|| ChainError::ReceiptTimeout(format!("{tx_hash:#x}")))
        })
    }

    async fn sign_typed_data(&self, typed_data: &serde_json::Value) -> Result<String, ChainError> {
        self.with(|s| s.signed.push(typed_data.clone()));
        Ok(format!("0x{}", "ab".repeat(65)))
    }
}

#[derive(Default)]
struct RelayerState {
    public_value: U256,
    public_failures_left: u32,
    public_calls: u32,
    fail_encrypt: bool,
    encrypted: Vec<u64>,
    user_value: U256,
    user_calls: u32,
    grant_requests: Vec<GrantRequest>,
    signed_requests: Vec<SignedUserDecrypt>,
}

pub(crate) struct MockRelayer {
    capability: DecryptCapability,
    state: Mutex<RelayerState>,
}

impl MockRelayer {
    pub fn new() -> Self {
        Self::with_capability(DecryptCapability::Direct)
    }

    pub fn with_capability(capability: DecryptCapability) -> Self {
        Self {
            capability,
            state: Mutex::new(RelayerState::default()),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut RelayerState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    /// Plaintext returned for any publicly decrypted handle.
    pub fn set_public_value(&self, value: u64) {
        self.set_public_raw(U256::from(value));
    }

    pub fn set_public_raw(&self, value: U256) {
        self.with(|s| s.public_value = value);
    }

    pub fn fail_public_decrypt_times(&self, times: u32) {
        self.with(|s| s.public_failures_left = times);
    }

    pub fn public_decrypt_calls(&self) -> u32 {
        self.with(|s| s.public_calls)
    }

    pub fn fail_encrypt(&self) {
        self.with(|s| s.fail_encrypt = true);
    }

    pub fn encrypted_values(&self) -> Vec<u64> {
        self.with(|s| s.encrypted.clone())
    }

    /// Plaintext returned by private (user) decryption.
    pub fn set_user_value(&self, value: u64) {
        self.with(|s| s.user_value = U256::from(value));
    }

    pub fn user_decrypt_calls(&self) -> u32 {
        self.with(|s| s.user_calls)
    }

    pub fn grant_requests(&self) -> Vec<GrantRequest> {
        self.with(|s| s.grant_requests.clone())
    }

    pub fn signed_requests(&self) -> Vec<SignedUserDecrypt> {
        self.with(|s| s.signed_requests.clone())
    }
}

#[async_trait]
impl EncryptionAdapter for MockRelayer {
    async fn encrypt_u64(
        &self,
        _contract: Address,
        _user: Address,
        value: u64,
    ) -> Result<EncryptedInput, RelayerError> {
        self.with(|s| {
            if s.fail_encrypt {
                return Err(RelayerError::Status {
                    status: 503,
                    body: "relayer unavailable".to_string(),
                });
            }
            s.encrypted.push(value);
            Ok(EncryptedInput {
                handle: Handle::from(B256::repeat_byte(0xE1)),
                proof: Bytes::from_static(&[0x01, 0x02]),
            })
        })
    }

    async fn public_decrypt(&self, handles: &[Handle]) -> Result<PublicDecryption, RelayerError> {
        self.with(|s| {
            s.public_calls += 1;
            if s.public_failures_left > 0 {
                s.public_failures_left -= 1;
                return Err(RelayerError::Request("connection reset".to_string()));
            }
            let clear_values = handles
                .iter()
                .map(|h| (h.as_str().to_string(), ClearValue::Uint(s.public_value)))
                .collect();
            Ok(PublicDecryption {
                clear_values,
                decryption_proof: Bytes::from_static(&[0xde, 0xad]),
            })
        })
    }

    fn decrypt_capability(&self) -> DecryptCapability {
        self.capability
    }

    async fn user_decrypt(&self, _handle: &Handle, _contract: Address) -> Result<U256, RelayerError> {
        if self.capability != DecryptCapability::Direct {
            return Err(RelayerError::Unsupported("direct user decryption"));
        }
        self.with(|s| {
            s.user_calls += 1;
            Ok(s.user_value)
        })
    }

    async fn generate_keypair(&self) -> Result<DecryptionKeypair, RelayerError> {
        Ok(DecryptionKeypair {
            public_key: "0xpub".to_string(),
            private_key: "0xpriv".to_string(),
        })
    }

    async fn create_eip712(&self, request: &GrantRequest) -> Result<serde_json::Value, RelayerError> {
        self.with(|s| s.grant_requests.push(request.clone()));
        Ok(serde_json::json!({ "primaryType": "UserDecryptRequestVerification" }))
    }

    async fn user_decrypt_with_grant(
        &self,
        request: &SignedUserDecrypt,
    ) -> Result<BTreeMap<String, ClearValue>, RelayerError> {
        self.with(|s| {
            s.signed_requests.push(request.clone());
            s.user_calls += 1;
            Ok(request
                .handle_contract_pairs
                .iter()
                .map(|p| (p.handle.normalized(), ClearValue::Uint(s.user_value)))
                .collect())
        })
    }
}
