// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The sim endpoint: operator-side relay simulation.
//!
//! Forwards a payload to an arbitrary URL through the executor and returns
//! the raw upstream body, bypassing validation and proof accounting. Useful
//! for checking a hosted chain before staking for it.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ApiError, CoreError};
use crate::relay::Payload;
use crate::state::AppState;

/// Parameters for a simulated relay.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SimRelayParams {
    /// Target URL the payload is forwarded to.
    pub url: String,
    /// The payload to forward.
    pub payload: Payload,
}

/// Simulate a relay against an explicit upstream URL.
#[utoipa::path(
    post,
    path = "/v1/client/sim",
    tag = "Client",
    request_body = SimRelayParams,
    responses(
        (status = 200, description = "Raw upstream body"),
        (status = 400, description = "Malformed request"),
        (status = 502, description = "Upstream failed")
    )
)]
pub async fn sim(
    State(state): State<AppState>,
    body: Result<Json<SimRelayParams>, JsonRejection>,
) -> Result<String, ApiError> {
    let Json(params) =
        body.map_err(|e| ApiError::from(CoreError::MalformedJson(e.to_string())))?;

    state
        .executor
        .execute_at(&params.url, &params.payload)
        .await
        .map_err(ApiError::from)
}
