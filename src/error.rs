// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Error Handling
//!
//! [`CoreError`] is the domain taxonomy of the relay core: every validation
//! and executor step returns its variant unmodified up to the pipeline
//! boundary, and nothing in the core retries. The taxonomy itself knows how
//! it projects onto HTTP ([`CoreError::http_status`]): a fault the client
//! authored (bad payload, broken signature chain, exhausted allowance) is a
//! 400, an upstream transport fault is 502/504, capacity exhaustion is 503,
//! and anything the node broke itself is a 500.
//!
//! [`ApiError`] is that projection: the status plus the variant's own
//! message, rendered to the wire as `{"error": "<message>"}` so relay
//! clients get one stable failure shape across every endpoint.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Domain errors produced by the relay servicing core.
///
/// The variants are grouped by fault origin: input shape, authorization,
/// policy, transport, capacity, and internal. The grouping drives
/// [`CoreError::http_status`].
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    // -------------------------------------------------------------------
    // Input / shape
    // -------------------------------------------------------------------
    /// Relay payload carries neither data nor a path.
    #[error("the relay payload is empty: data and path are both missing")]
    EmptyPayload,

    /// The proof's request hash does not match the payload and meta.
    #[error("the relay request hash does not match the payload and meta")]
    RequestHashMismatch,

    /// The client's reported block height is outside the allowance window.
    #[error("relay meta height {client} is out of sync with node height {node}")]
    OutOfSyncRequest { client: i64, node: i64 },

    /// A structure failed to serialize or deserialize.
    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    // -------------------------------------------------------------------
    // Authorization
    // -------------------------------------------------------------------
    /// The application signature on the AAT does not verify.
    #[error("the application signature on the AAT is invalid")]
    InvalidAppSignature,

    /// The client signature on the relay proof does not verify.
    #[error("the client signature on the relay proof is invalid")]
    InvalidClientSignature,

    /// The application authority token is structurally invalid.
    #[error("invalid application authority token: {0}")]
    InvalidAat(String),

    /// The relay cannot be pinned to a valid session.
    #[error("invalid session: {0}")]
    InvalidSession(String),

    /// A challenge proof failed validation.
    #[error("invalid challenge: {0}")]
    InvalidChallenge(String),

    // -------------------------------------------------------------------
    // Policy
    // -------------------------------------------------------------------
    /// The requested blockchain is not hosted by this node.
    #[error("blockchain {0} is not hosted by this node")]
    UnsupportedBlockchain(String),

    /// The application exhausted its relay allowance for this session.
    #[error("the application is over its relay allowance for this session")]
    OverService,

    /// A proof with the same (entropy, height, servicer) was already recorded.
    #[error("a proof with this entropy was already recorded for the session")]
    DuplicateProof,

    /// The relay proof names a different servicer than this node.
    #[error("the relay proof names a different servicer than this node")]
    ServicerMismatch,

    /// A dispatch request could not be resolved to a session.
    #[error("could not dispatch a session: {0}")]
    InvalidSessionDispatch(String),

    /// The candidate pool is smaller than the configured session size.
    #[error("not enough eligible nodes: {available} available, {required} required")]
    InsufficientNodes { available: usize, required: usize },

    // -------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------
    /// The upstream chain answered with a non-success status.
    #[error("upstream returned HTTP status {0}")]
    HttpStatus(u16),

    /// The upstream request failed below the HTTP layer.
    #[error("upstream execution failed: {0}")]
    HttpExecution(String),

    /// The upstream request exceeded its deadline.
    #[error("upstream request timed out")]
    Timeout,

    // -------------------------------------------------------------------
    // Capacity
    // -------------------------------------------------------------------
    /// The node is at its concurrent in-flight relay limit.
    #[error("the node is at its concurrent relay limit")]
    TooBusy,

    // -------------------------------------------------------------------
    // Internal
    // -------------------------------------------------------------------
    /// The ledger state accessor could not answer.
    #[error("ledger state unavailable: {0}")]
    StateUnavailable(String),

    /// The session cache returned an inconsistent entry.
    #[error("session cache corrupt: {0}")]
    CacheCorrupt(String),

    /// The node produced a relay response that fails its own validation.
    #[error("invalid relay response: {0}")]
    InvalidResponse(String),
}

impl CoreError {
    /// The HTTP status this fault surfaces as.
    ///
    /// Client-authored faults are 400 so the client knows to fix the relay
    /// rather than retry it; upstream faults are gateway errors; capacity
    /// is 503 (retry against another servicer in the session); node faults
    /// are 500.
    pub fn http_status(&self) -> StatusCode {
        match self {
            CoreError::HttpStatus(_) | CoreError::HttpExecution(_) => StatusCode::BAD_GATEWAY,
            CoreError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            CoreError::TooBusy => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::StateUnavailable(_)
            | CoreError::CacheCorrupt(_)
            | CoreError::InvalidResponse(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Whether the fault lies with the caller rather than with this node
    /// or its upstream.
    pub fn is_client_fault(&self) -> bool {
        self.http_status() == StatusCode::BAD_REQUEST
    }
}

/// A [`CoreError`] projected onto the HTTP boundary.
///
/// Handlers return this directly; the response body is always
/// `{"error": "<the variant's message>"}`.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status derived from the error's taxonomy group.
    pub status: StatusCode,
    /// The domain error's rendered message.
    pub message: String,
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self {
            status: err.http_status(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}
