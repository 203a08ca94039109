// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token operation endpoints: plain-to-confidential, transfers and faucet mint.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ActionStatus;
use crate::{
    actions::TxResult, conversion::ConversionError, error::ApiError, state::AppState,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AmountRequest {
    /// Human-readable amount, e.g. "12.5".
    pub amount: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransferRequest {
    /// Recipient address (0x-prefixed).
    pub to: String,
    pub amount: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct MintRequest {
    /// Mint to this address instead of the connected account.
    pub to: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TxResponse {
    pub status: ActionStatus,
    pub tx_hash: Option<String>,
    pub block_number: Option<u64>,
}

fn tx_response(result: Result<TxResult, ConversionError>) -> Result<Json<TxResponse>, ApiError> {
    match result {
        Ok(tx) => Ok(Json(TxResponse {
            status: ActionStatus::Completed,
            tx_hash: Some(format!("{:#x}", tx.tx_hash)),
            block_number: tx.block_number,
        })),
        Err(e) if e.is_user_cancelled() => Ok(Json(TxResponse {
            status: ActionStatus::Cancelled,
            tx_hash: None,
            block_number: None,
        })),
        Err(e) => Err(e.into()),
    }
}

/// Move plain balance into the confidential balance.
#[utoipa::path(
    post,
    path = "/v1/tokens/convert-to-confidential",
    tag = "Tokens",
    request_body = AmountRequest,
    responses(
        (status = 200, description = "Transaction confirmed, or signature declined", body = TxResponse),
        (status = 400, description = "Invalid amount"),
        (status = 422, description = "Transaction reverted")
    )
)]
pub async fn convert_to_confidential(
    State(state): State<AppState>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<TxResponse>, ApiError> {
    tx_response(state.actions.convert_to_confidential(&request.amount).await)
}

/// Plain ERC-20 transfer.
#[utoipa::path(
    post,
    path = "/v1/tokens/transfer",
    tag = "Tokens",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transaction confirmed, or signature declined", body = TxResponse),
        (status = 400, description = "Invalid recipient or amount"),
        (status = 422, description = "Transaction reverted")
    )
)]
pub async fn transfer(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TxResponse>, ApiError> {
    tx_response(state.actions.transfer(&request.to, &request.amount).await)
}

/// Encrypted transfer from the confidential balance.
#[utoipa::path(
    post,
    path = "/v1/tokens/confidential-transfer",
    tag = "Tokens",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transaction confirmed, or signature declined", body = TxResponse),
        (status = 400, description = "Invalid recipient or amount"),
        (status = 502, description = "Relayer unavailable")
    )
)]
pub async fn confidential_transfer(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TxResponse>, ApiError> {
    tx_response(
        state
            .actions
            .confidential_transfer(&request.to, &request.amount)
            .await,
    )
}

/// Faucet mint.
#[utoipa::path(
    post,
    path = "/v1/tokens/mint",
    tag = "Tokens",
    request_body = MintRequest,
    responses(
        (status = 200, description = "Transaction confirmed, or signature declined", body = TxResponse),
        (status = 400, description = "Invalid recipient")
    )
)]
pub async fn mint(
    State(state): State<AppState>,
    Json(request): Json<MintRequest>,
) -> Result<Json<TxResponse>, ApiError> {
    tx_response(state.actions.mint(request.to.as_deref()).await)
}
