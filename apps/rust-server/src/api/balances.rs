// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Balance and notification endpoints.

use axum::{extract::State, Json};

use crate::{
    actions::ConfidentialBalance, blockchain::TokenBalance, error::ApiError, state::AppState,
    views::NotificationSnapshot,
};

/// Plain (ERC-20) balance of the connected account.
///
/// Served from cache until the next `balance-changed` notification.
#[utoipa::path(
    get,
    path = "/v1/balances/plain",
    tag = "Balances",
    responses(
        (status = 200, description = "Plain balance", body = TokenBalance),
        (status = 502, description = "Blockchain network unavailable")
    )
)]
pub async fn get_plain_balance(State(state): State<AppState>) -> Result<Json<TokenBalance>, ApiError> {
    Ok(Json(state.plain_balance.get().await?))
}

/// Decrypted confidential balance of the connected account.
#[utoipa::path(
    get,
    path = "/v1/balances/confidential",
    tag = "Balances",
    responses(
        (status = 200, description = "Confidential balance", body = ConfidentialBalance),
        (status = 502, description = "Relayer or blockchain unavailable")
    )
)]
pub async fn get_confidential_balance(
    State(state): State<AppState>,
) -> Result<Json<ConfidentialBalance>, ApiError> {
    Ok(Json(state.actions.confidential_balance().await?))
}

/// Number of notifications emitted per topic since startup.
///
/// Clients compare counts between polls to know when to refetch.
#[utoipa::path(
    get,
    path = "/v1/notifications",
    tag = "Balances",
    responses(
        (status = 200, description = "Notification counters", body = NotificationSnapshot)
    )
)]
pub async fn get_notifications(State(state): State<AppState>) -> Json<NotificationSnapshot> {
    Json(state.notifications.snapshot())
}
