// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The relay endpoint: the node's core serving surface.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::error::{ApiError, CoreError};
use crate::relay::{pipeline, Relay, RelayResponse};
use crate::state::AppState;

/// Serve a client relay.
///
/// Validates the signature chain, forwards the payload to the hosted chain,
/// records the proof, and returns the node-signed response.
#[utoipa::path(
    post,
    path = "/v1/client/relay",
    tag = "Client",
    request_body = Relay,
    responses(
        (status = 200, description = "Relay served", body = RelayResponse),
        (status = 400, description = "Relay rejected"),
        (status = 502, description = "Upstream chain failed"),
        (status = 503, description = "Node at capacity")
    )
)]
pub async fn relay(
    State(state): State<AppState>,
    body: Result<Json<Relay>, JsonRejection>,
) -> Result<Json<RelayResponse>, ApiError> {
    let Json(relay) = body.map_err(|e| ApiError::from(CoreError::MalformedJson(e.to_string())))?;

    let session = relay.evidence_header().fingerprint();
    let proof = relay.proof.fingerprint();
    match pipeline::serve_relay(&state, relay).await {
        Ok(response) => Ok(Json(response)),
        Err(err) => {
            tracing::warn!(session = %session, proof = %proof, error = %err, "relay rejected");
            Err(err.into())
        }
    }
}
