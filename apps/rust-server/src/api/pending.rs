// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pending conversion endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::ActionStatus;
use crate::{
    blockchain::ConversionRecord,
    conversion::{ConversionError, PendingActionResult},
    error::ApiError,
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct PendingListResponse {
    pub conversions: Vec<ConversionRecord>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PendingActionResponse {
    pub status: ActionStatus,
    pub conversion_id: u64,
    pub tx_hash: Option<String>,
    /// Finalized amount in base units (retry only).
    pub amount: Option<u64>,
}

impl PendingActionResponse {
    fn from_result(
        conversion_id: u64,
        result: Result<PendingActionResult, ConversionError>,
    ) -> Result<Self, ApiError> {
        match result {
            Ok(done) => Ok(Self {
                status: ActionStatus::Completed,
                conversion_id,
                tx_hash: Some(format!("{:#x}", done.tx_hash)),
                amount: done.amount,
            }),
            Err(e) if e.is_user_cancelled() => Ok(Self {
                status: ActionStatus::Cancelled,
                conversion_id,
                tx_hash: None,
                amount: None,
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// List the connected account's pending conversions, newest first.
#[utoipa::path(
    get,
    path = "/v1/conversions/pending",
    tag = "Conversions",
    responses(
        (status = 200, description = "Pending conversions", body = PendingListResponse)
    )
)]
pub async fn list_pending(State(state): State<AppState>) -> Json<PendingListResponse> {
    Json(PendingListResponse {
        conversions: state.pending.list().await,
    })
}

/// Decrypt and finalize a pending conversion.
#[utoipa::path(
    post,
    path = "/v1/conversions/pending/{conversion_id}/retry",
    tag = "Conversions",
    params(("conversion_id" = u64, Path, description = "On-chain conversion id")),
    responses(
        (status = 200, description = "Conversion finalized, or signature declined", body = PendingActionResponse),
        (status = 400, description = "Conversion is not pending"),
        (status = 409, description = "An action on this conversion is already running"),
        (status = 502, description = "Relayer or chain unavailable")
    )
)]
pub async fn retry_pending(
    State(state): State<AppState>,
    Path(conversion_id): Path<u64>,
) -> Result<Json<PendingActionResponse>, ApiError> {
    let result = state.pending.retry(conversion_id).await;
    Ok(Json(PendingActionResponse::from_result(conversion_id, result)?))
}

/// Cancel a pending conversion and refund the locked amount.
#[utoipa::path(
    post,
    path = "/v1/conversions/pending/{conversion_id}/cancel",
    tag = "Conversions",
    params(("conversion_id" = u64, Path, description = "On-chain conversion id")),
    responses(
        (status = 200, description = "Conversion cancelled on chain, or signature declined", body = PendingActionResponse),
        (status = 400, description = "Conversion is not pending"),
        (status = 409, description = "An action on this conversion is already running")
    )
)]
pub async fn cancel_pending(
    State(state): State<AppState>,
    Path(conversion_id): Path<u64>,
) -> Result<Json<PendingActionResponse>, ApiError> {
    let result = state.pending.cancel(conversion_id).await;
    Ok(Json(PendingActionResponse::from_result(conversion_id, result)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    use crate::blockchain::Handle;
    use crate::testing::MockFailure;

    #[tokio::test]
    async fn list_returns_pending_only() {
        let (state, chain, _) = AppState::mocked();
        chain.add_conversion(1, Handle::new("0x01"), true, 10);
        chain.add_conversion(2, Handle::new("0x02"), false, 20);

        let Json(body) = list_pending(State(state)).await;
        assert_eq!(body.conversions.len(), 1);
        assert_eq!(body.conversions[0].id, 1);
    }

    #[tokio::test]
    async fn retry_completes() {
        let (state, chain, relayer) = AppState::mocked();
        chain.add_conversion(4, Handle::new("0x04"), true, 10);
        relayer.set_public_value(9);

        let Json(body) = retry_pending(State(state.clone()), Path(4)).await.unwrap();
        assert!(matches!(body.status, ActionStatus::Completed));
        assert_eq!(body.amount, Some(9));
        assert_eq!(state.notifications.snapshot().counts["pending-list-changed"], 1);
    }

    #[tokio::test]
    async fn declined_cancel_is_reported_as_cancelled() {
        let (state, chain, _) = AppState::mocked();
        chain.add_conversion(4, Handle::new("0x04"), true, 10);
        chain.fail_cancel(MockFailure::Rejected);

        let Json(body) = cancel_pending(State(state), Path(4)).await.unwrap();
        assert!(matches!(body.status, ActionStatus::Cancelled));
        assert!(body.tx_hash.is_none());
    }

    #[tokio::test]
    async fn reverted_cancel_is_unprocessable() {
        let (state, chain, _) = AppState::mocked();
        chain.add_conversion(4, Handle::new("0x04"), true, 10);
        chain.fail_cancel(MockFailure::Reverted);

        let err = cancel_pending(State(state), Path(4)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn non_pending_conversion_is_bad_request() {
        let (state, chain, _) = AppState::mocked();
        chain.add_conversion(4, Handle::new("0x04"), false, 10);

        let err = retry_pending(State(state), Path(4)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
