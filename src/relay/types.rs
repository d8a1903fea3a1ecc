// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relay wire types.
//!
//! Field declaration order matters in this file: structure digests are taken
//! over the serde JSON serialization, so the declared order *is* the
//! canonical order. `headers` is the only field omitted when empty, and
//! signature fields are replaced by the empty string before hashing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::crypto::{self, decode_signature};
use crate::error::CoreError;
use crate::session::{Session, SessionHeader};

use super::proof::RelayProof;

/// Default HTTP method for relays that do not name one.
pub const DEFAULT_HTTP_METHOD: &str = "POST";

/// The data a relay carries to the non-native chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Payload {
    /// Raw request body forwarded verbatim to the upstream chain.
    pub data: String,
    /// HTTP method; empty means [`DEFAULT_HTTP_METHOD`].
    #[serde(default)]
    pub method: String,
    /// REST path appended to the hosted chain's base URL.
    #[serde(default)]
    pub path: String,
    /// HTTP headers for the upstream request.
    #[serde(default, skip_serializing_if = "headers_unset")]
    pub headers: Option<HashMap<String, String>>,
}

fn headers_unset(headers: &Option<HashMap<String, String>>) -> bool {
    headers.as_ref().map_or(true, |h| h.is_empty())
}

impl Payload {
    /// A payload must carry data or a path; an empty relay serves nothing.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.data.is_empty() && self.path.is_empty() {
            return Err(CoreError::EmptyPayload);
        }
        Ok(())
    }
}

/// Metadata pinning a relay to the client's view of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RelayMeta {
    /// Block height at which the client built the relay.
    pub block_height: i64,
}

impl RelayMeta {
    /// The client's height must be within the allowance window around the
    /// node's current height.
    pub fn validate(&self, node_height: i64, allowance: i64) -> Result<(), CoreError> {
        if self.block_height < node_height - allowance || self.block_height > node_height + allowance
        {
            return Err(CoreError::OutOfSyncRequest {
                client: self.block_height,
                node: node_height,
            });
        }
        Ok(())
    }
}

/// A read/write API request from a hosted external blockchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Relay {
    /// The data payload of the request.
    pub payload: Payload,
    /// Metadata for the relay request.
    pub meta: RelayMeta,
    /// The authentication scheme needed for work.
    pub proof: RelayProof,
}

/// Canonical form hashed into the request hash: payload and meta only.
#[derive(Serialize)]
struct RequestSeed<'a> {
    payload: &'a Payload,
    meta: &'a RelayMeta,
}

impl Relay {
    /// Digest over the relay's payload and meta.
    pub fn request_hash(&self) -> Result<[u8; 32], CoreError> {
        let seed = serde_json::to_vec(&RequestSeed {
            payload: &self.payload,
            meta: &self.meta,
        })
        .map_err(|e| CoreError::MalformedJson(e.to_string()))?;
        Ok(crypto::hash(&seed))
    }

    /// Hex digest over the relay's payload and meta.
    pub fn request_hash_hex(&self) -> Result<String, CoreError> {
        Ok(hex::encode(self.request_hash()?))
    }

    /// The session header the relay's proof partitions evidence under.
    pub fn evidence_header(&self) -> SessionHeader {
        SessionHeader {
            application_public_key: self.proof.token.application_public_key.clone(),
            blockchain: self.proof.blockchain.clone(),
            session_block_height: self.proof.session_block_height,
        }
    }
}

/// The node-signed answer to a relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RelayResponse {
    /// Servicer signature over the response digest, hex.
    pub signature: String,
    /// Upstream response body, passed through to the client.
    pub response: String,
    /// The proof this response answers; the client countersigns it later.
    pub proof: RelayProof,
}

/// Canonical form hashed for the servicer signature: signature cleared, the
/// proof collapsed to its digest.
#[derive(Serialize)]
struct ResponseSeed<'a> {
    signature: &'a str,
    response: &'a str,
    proof: String,
}

impl RelayResponse {
    /// Digest of the response with its signature cleared.
    pub fn hash(&self) -> Result<[u8; 32], CoreError> {
        let seed = serde_json::to_vec(&ResponseSeed {
            signature: "",
            response: &self.response,
            proof: self.proof.hash_hex()?,
        })
        .map_err(|e| CoreError::MalformedJson(e.to_string()))?;
        Ok(crypto::hash(&seed))
    }

    /// Hex digest of the response.
    pub fn hash_hex(&self) -> Result<String, CoreError> {
        Ok(hex::encode(self.hash()?))
    }

    /// The node checks its own answer before returning it: a response must
    /// carry a body and a well-formed signature of exactly the Ed25519
    /// signature size.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.response.is_empty() {
            return Err(CoreError::InvalidResponse("empty response body".to_string()));
        }
        if self.signature.is_empty() || decode_signature(&self.signature).is_err() {
            return Err(CoreError::InvalidResponse(
                "response signature must be 64 bytes of hex".to_string(),
            ));
        }
        Ok(())
    }
}

/// Answer to a dispatch query: the session and the node's current height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DispatchResponse {
    /// The derived session for the requested header.
    pub session: Session,
    /// The node's current block height.
    pub block_height: i64,
}
