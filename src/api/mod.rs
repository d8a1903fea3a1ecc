// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # HTTP Surface
//!
//! The client-facing endpoints of the node, all under `/v1/client`:
//!
//! | Path | Body | Response |
//! |------|------|----------|
//! | `/v1/client/relay` | `Relay` | `RelayResponse` |
//! | `/v1/client/dispatch` | `SessionHeader` | `DispatchResponse` |
//! | `/v1/client/challenge` | `ChallengeProofInvalidData` | `ChallengeResponse` |
//! | `/v1/client/sim` | `SimRelayParams` | raw upstream body |
//!
//! Plus `/health`, `/health/live`, `/health/ready` probes and the OpenAPI
//! document at `/api-doc/openapi.json`. Every validation failure is a 400
//! with `{"error": "..."}`; CORS preflight is honored on all routes.

use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::OpenApi;

use crate::state::AppState;

pub mod challenge;
pub mod dispatch;
pub mod health;
pub mod relay;
pub mod sim;

/// Build the complete router for the node.
pub fn router(state: AppState) -> Router {
    let client_routes = Router::new()
        .route("/client/relay", post(relay::relay))
        .route("/client/dispatch", post(dispatch::dispatch))
        .route("/client/challenge", post(challenge::challenge))
        .route("/client/sim", post(sim::sim));

    Router::new()
        // Health endpoints (no relay state needed beyond read access)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        // Client API v1 routes
        .nest("/v1", client_routes)
        // OpenAPI document
        .route("/api-doc/openapi.json", get(openapi_json))
        .layer(build_cors_layer())
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build CORS layer from environment configuration.
///
/// - If `CORS_ALLOWED_ORIGINS` is set, only those origins are allowed.
///   Multiple origins can be comma-separated.
/// - If not set, falls back to permissive CORS (clients relay from
///   anywhere by design).
fn build_cors_layer() -> CorsLayer {
    if let Ok(origins) = std::env::var("CORS_ALLOWED_ORIGINS") {
        let allowed: Vec<_> = origins
            .split(',')
            .map(|s| s.trim().parse().expect("Invalid CORS origin"))
            .collect();
        tracing::info!(origins = %origins, "CORS: restricting to configured origins");
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    } else {
        CorsLayer::permissive()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        relay::relay,
        dispatch::dispatch,
        challenge::challenge,
        sim::sim,
        health::health,
        health::liveness,
        health::readiness,
    ),
    components(schemas(
        crate::relay::Relay,
        crate::relay::Payload,
        crate::relay::RelayMeta,
        crate::relay::RelayProof,
        crate::relay::Aat,
        crate::relay::RelayResponse,
        crate::relay::DispatchResponse,
        crate::relay::ChallengeProofInvalidData,
        crate::relay::ChallengeResponse,
        crate::session::SessionHeader,
        crate::session::Session,
        crate::ledger::Validator,
        crate::ledger::StakeStatus,
        sim::SimRelayParams,
        health::ReadyResponse,
        health::HealthChecks,
        health::HealthResponse,
    )),
    tags(
        (name = "Client", description = "Relay servicing endpoints"),
        (name = "Health", description = "Liveness and readiness probes")
    ),
    info(
        title = "Relay Node API",
        description = "Decentralized relay servicing node"
    )
)]
struct ApiDoc;
