// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the FHE relayer gateway.
//!
//! The gateway wraps the fhEVM relayer SDK (input encryption, public and
//! user decryption) behind a small JSON API:
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | GET  | `/v1/capabilities` | Report the private-decryption capability |
//! | POST | `/v1/encrypt` | Encrypt a `uint64` input, returns handles + input proof |
//! | POST | `/v1/public-decrypt` | Public decryption with proof |
//! | POST | `/v1/user-decrypt` | Single-call private decryption |
//! | POST | `/v1/keypair` | Ephemeral keypair for a decryption grant |
//! | POST | `/v1/eip712` | EIP-712 typed data for a decryption grant |
//! | POST | `/v1/user-decrypt/signed` | Private decryption authorised by a signed grant |

use std::collections::BTreeMap;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{
    ClearValue, DecryptCapability, DecryptionKeypair, EncryptionAdapter, GrantRequest,
    PublicDecryption, RelayerError, SignedUserDecrypt,
};
use crate::blockchain::{EncryptedInput, Handle};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CapabilitiesResponse {
    user_decrypt: DecryptCapability,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncryptResponse {
    handles: Vec<Handle>,
    input_proof: Bytes,
}

#[derive(Debug, Deserialize)]
struct UserDecryptResponse {
    value: U256,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignedUserDecryptResponse {
    clear_values: BTreeMap<String, ClearValue>,
}

/// Relayer gateway client. The decryption capability is fetched once in
/// [`HttpRelayer::connect`] and never re-probed.
#[derive(Debug, Clone)]
pub struct HttpRelayer {
    base_url: String,
    capability: DecryptCapability,
    http: Client,
}

impl HttpRelayer {
    pub async fn connect(base_url: &str) -> Result<Self, RelayerError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        url::Url::parse(&base_url).map_err(|e| RelayerError::Config(format!("{base_url}: {e}")))?;

        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| RelayerError::Request(format!("failed to build HTTP client: {e}")))?;

        let mut relayer = Self {
            base_url,
            capability: DecryptCapability::SignedGrant,
            http,
        };

        let caps: CapabilitiesResponse = relayer.get_json("/v1/capabilities").await?;
        relayer.capability = caps.user_decrypt;

        tracing::info!(
            relayer = %relayer.base_url,
            capability = ?relayer.capability,
            "Connected to FHE relayer"
        );
        Ok(relayer)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RelayerError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RelayerError::Request(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, RelayerError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Relayer request");
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| RelayerError::Request(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RelayerError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayerError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| RelayerError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl EncryptionAdapter for HttpRelayer {
    async fn encrypt_u64(
        &self,
        contract: Address,
        user: Address,
        value: u64,
    ) -> Result<EncryptedInput, RelayerError> {
        let payload = json!({
            "contractAddress": contract,
            "userAddress": user,
            "values": [{ "type": "uint64", "value": value.to_string() }],
        });

        let response: EncryptResponse = self.post_json("/v1/encrypt", &payload).await?;
        let handle = response
            .handles
            .into_iter()
            .next()
            .ok_or_else(|| RelayerError::InvalidResponse("no handle in encrypt response".to_string()))?;

        Ok(EncryptedInput {
            handle,
            proof: response.input_proof,
        })
    }

    async fn public_decrypt(&self, handles: &[Handle]) -> Result<PublicDecryption, RelayerError> {
        self.post_json("/v1/public-decrypt", &json!({ "handles": handles }))
            .await
    }

    fn decrypt_capability(&self) -> DecryptCapability {
        self.capability
    }

    async fn user_decrypt(&self, handle: &Handle, contract: Address) -> Result<U256, RelayerError> {
        if self.capability != DecryptCapability::Direct {
            return Err(RelayerError::Unsupported("direct user decryption"));
        }
        let response: UserDecryptResponse = self
            .post_json(
                "/v1/user-decrypt",
                &json!({ "handle": handle, "contractAddress": contract }),
            )
            .await?;
        Ok(response.value)
    }

    async fn generate_keypair(&self) -> Result<DecryptionKeypair, RelayerError> {
        self.post_json("/v1/keypair", &json!({})).await
    }

    async fn create_eip712(&self, request: &GrantRequest) -> Result<serde_json::Value, RelayerError> {
        self.post_json("/v1/eip712", request).await
    }

    async fn user_decrypt_with_grant(
        &self,
        request: &SignedUserDecrypt,
    ) -> Result<BTreeMap<String, ClearValue>, RelayerError> {
        let response: SignedUserDecryptResponse =
            self.post_json("/v1/user-decrypt/signed", request).await?;
        Ok(response.clear_values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_rejects_invalid_base_url() {
        let err = HttpRelayer::connect("not a url").await.unwrap_err();
        assert!(matches!(err, RelayerError::Config(_)));
    }

    #[tokio::test]
    async fn connect_reports_unreachable_relayer() {
        // Port 9 (discard) on localhost is not expected to serve HTTP.
        let err = HttpRelayer::connect("http://127.0.0.1:9").await.unwrap_err();
        assert!(matches!(err, RelayerError::Request(_)));
    }

    #[test]
    fn encrypt_response_parses() {
        let parsed: EncryptResponse = serde_json::from_value(json!({
            "handles": ["0xABCD"],
            "inputProof": "0xbeef"
        }))
        .unwrap();
        assert_eq!(parsed.handles[0].as_str(), "0xABCD");
        assert_eq!(parsed.input_proof, Bytes::from(vec![0xbe, 0xef]));
    }

    #[test]
    fn capabilities_response_parses() {
        let parsed: CapabilitiesResponse =
            serde_json::from_value(json!({ "userDecrypt": "direct" })).unwrap();
        assert_eq!(parsed.user_decrypt, DecryptCapability::Direct);
    }
}
