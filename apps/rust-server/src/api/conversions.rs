// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Confidential-to-plain conversion endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    conversion::{ConversionOutcome, ConversionSession},
    error::ApiError,
    state::AppState,
};

/// Request to convert confidential balance to plain balance.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StartConversionRequest {
    /// Human-readable amount, e.g. "12.5".
    pub amount: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct StartConversionQuery {
    /// Run the conversion to completion before responding.
    #[param(default = false)]
    pub wait: Option<bool>,
}

/// Start a conversion.
///
/// By default the conversion runs in the background and the initial session
/// is returned with 202; poll `/v1/conversions/session` for progress. With
/// `wait=true` the final outcome is returned instead.
#[utoipa::path(
    post,
    path = "/v1/conversions",
    tag = "Conversions",
    params(StartConversionQuery),
    request_body = StartConversionRequest,
    responses(
        (status = 202, description = "Conversion started", body = ConversionSession),
        (status = 200, description = "Conversion finished (wait=true)", body = ConversionOutcome),
        (status = 400, description = "Invalid amount"),
        (status = 409, description = "A conversion is already running")
    )
)]
pub async fn start_conversion(
    State(state): State<AppState>,
    Query(query): Query<StartConversionQuery>,
    Json(request): Json<StartConversionRequest>,
) -> Result<Response, ApiError> {
    let orchestrator = state.orchestrator.clone();
    let value = orchestrator.begin(&request.amount)?;

    let session = orchestrator.snapshot();

    // Dropping the request does not cancel the run.
    let task = tokio::spawn(async move {
        let outcome = orchestrator.run(value).await;
        tracing::debug!(?outcome, "Conversion task finished");
        outcome
    });

    if query.wait.unwrap_or(false) {
        let outcome = task.await.map_err(|e| {
            tracing::error!(error = %e, "Conversion task failed");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Conversion task failed")
        })?;
        return Ok((StatusCode::OK, Json(outcome)).into_response());
    }

    Ok((StatusCode::ACCEPTED, Json(session)).into_response())
}

/// Current conversion session.
#[utoipa::path(
    get,
    path = "/v1/conversions/session",
    tag = "Conversions",
    responses(
        (status = 200, description = "Session snapshot", body = ConversionSession)
    )
)]
pub async fn get_session(State(state): State<AppState>) -> Json<ConversionSession> {
    Json(state.orchestrator.snapshot())
}

/// Dismiss a failed or recoverable session.
#[utoipa::path(
    delete,
    path = "/v1/conversions/session",
    tag = "Conversions",
    responses(
        (status = 200, description = "Session reset", body = ConversionSession),
        (status = 409, description = "A conversion is still running")
    )
)]
pub async fn dismiss_session(State(state): State<AppState>) -> Result<Json<ConversionSession>, ApiError> {
    Ok(Json(state.orchestrator.dismiss()?))
}
