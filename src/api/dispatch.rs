// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The dispatch endpoint: session lookup for clients.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::error::{ApiError, CoreError};
use crate::relay::{pipeline, DispatchResponse};
use crate::session::SessionHeader;
use crate::state::AppState;

/// Answer a client's "where do I send my relay" query.
///
/// Derives (or fetches) the current session for the requested application
/// and chain, clamping the height to the current session epoch.
#[utoipa::path(
    post,
    path = "/v1/client/dispatch",
    tag = "Client",
    request_body = SessionHeader,
    responses(
        (status = 200, description = "Current session", body = DispatchResponse),
        (status = 400, description = "Dispatch rejected")
    )
)]
pub async fn dispatch(
    State(state): State<AppState>,
    body: Result<Json<SessionHeader>, JsonRejection>,
) -> Result<Json<DispatchResponse>, ApiError> {
    let Json(header) = body.map_err(|e| ApiError::from(CoreError::MalformedJson(e.to_string())))?;

    let fingerprint = header.fingerprint();
    match pipeline::dispatch_session(&state, header) {
        Ok(response) => Ok(Json(response)),
        Err(err) => {
            tracing::warn!(session = %fingerprint, error = %err, "dispatch rejected");
            Err(err.into())
        }
    }
}
