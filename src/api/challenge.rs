// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The challenge endpoint: reporting conflicting relay responses.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::error::{ApiError, CoreError};
use crate::relay::{ChallengeProofInvalidData, ChallengeResponse};
use crate::state::AppState;

/// Accept a challenge against a servicer that answered a relay differently
/// than the session majority.
///
/// The node validates the bundle and acknowledges it; the resulting
/// settlement transaction is handled outside the serving core.
#[utoipa::path(
    post,
    path = "/v1/client/challenge",
    tag = "Client",
    request_body = ChallengeProofInvalidData,
    responses(
        (status = 200, description = "Challenge accepted", body = ChallengeResponse),
        (status = 400, description = "Challenge rejected")
    )
)]
pub async fn challenge(
    State(_state): State<AppState>,
    body: Result<Json<ChallengeProofInvalidData>, JsonRejection>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    let Json(data) = body.map_err(|e| ApiError::from(CoreError::MalformedJson(e.to_string())))?;

    let challenged = data.minority_response.proof.fingerprint();
    match data.validate() {
        Ok(()) => {
            tracing::info!(servicer = %challenged, "challenge accepted");
            Ok(Json(ChallengeResponse {
                response: format!("challenge accepted against servicer {challenged}"),
            }))
        }
        Err(err) => {
            tracing::warn!(servicer = %challenged, error = %err, "challenge rejected");
            Err(err.into())
        }
    }
}
