// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    actions::ConfidentialBalance,
    blockchain::{ConversionRecord, Handle, TokenBalance},
    conversion::{ConversionOutcome, ConversionPhase, ConversionSession, ErrorKind},
    events::Topic,
    state::AppState,
    views::NotificationSnapshot,
};

pub mod balances;
pub mod conversions;
pub mod health;
pub mod pending;
pub mod tokens;

/// Outcome of a user-signed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Completed,
    /// The signature was declined; nothing was submitted.
    Cancelled,
}

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/conversions", post(conversions::start_conversion))
        .route(
            "/conversions/session",
            get(conversions::get_session).delete(conversions::dismiss_session),
        )
        .route("/conversions/pending", get(pending::list_pending))
        .route(
            "/conversions/pending/{conversion_id}/retry",
            post(pending::retry_pending),
        )
        .route(
            "/conversions/pending/{conversion_id}/cancel",
            post(pending::cancel_pending),
        )
        .route("/balances/plain", get(balances::get_plain_balance))
        .route("/balances/confidential", get(balances::get_confidential_balance))
        .route("/notifications", get(balances::get_notifications))
        .route(
            "/tokens/convert-to-confidential",
            post(tokens::convert_to_confidential),
        )
        .route("/tokens/transfer", post(tokens::transfer))
        .route("/tokens/confidential-transfer", post(tokens::confidential_transfer))
        .route("/tokens/mint", post(tokens::mint))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        conversions::start_conversion,
        conversions::get_session,
        conversions::dismiss_session,
        pending::list_pending,
        pending::retry_pending,
        pending::cancel_pending,
        balances::get_plain_balance,
        balances::get_confidential_balance,
        balances::get_notifications,
        tokens::convert_to_confidential,
        tokens::transfer,
        tokens::confidential_transfer,
        tokens::mint
    ),
    components(
        schemas(
            ActionStatus,
            ConversionSession,
            ConversionPhase,
            ConversionOutcome,
            ConversionRecord,
            ErrorKind,
            Handle,
            Topic,
            TokenBalance,
            ConfidentialBalance,
            NotificationSnapshot,
            conversions::StartConversionRequest,
            pending::PendingListResponse,
            pending::PendingActionResponse,
            tokens::AmountRequest,
            tokens::TransferRequest,
            tokens::MintRequest,
            tokens::TxResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Conversions", description = "Confidential-to-plain conversion and pending conversions"),
        (name = "Balances", description = "Plain and confidential balances, change notifications"),
        (name = "Tokens", description = "Plain-to-confidential conversion, transfers and faucet mint")
    )
)]
struct ApiDoc;
