// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Application authority tokens.
//!
//! An AAT is a capability issued by an application to a client: the
//! application signs the token digest, and the named client key is then
//! entitled to sign relay proofs on the application's behalf.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::crypto::{self, PUBLIC_KEY_SIZE};
use crate::error::CoreError;

/// Token versions this node accepts.
pub const SUPPORTED_TOKEN_VERSIONS: &[&str] = &["0.0.1"];

/// Application authority token: an application-signed grant to a client key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Aat {
    /// Token format version (semver string).
    pub version: String,
    /// Public key of the issuing application.
    pub application_public_key: String,
    /// Public key of the entitled client.
    pub client_public_key: String,
    /// Application signature over the token digest, hex.
    pub application_signature: String,
}

/// Canonical form hashed for the application signature: the signature field
/// itself is replaced by the empty string.
#[derive(Serialize)]
struct AatSeed<'a> {
    version: &'a str,
    application_public_key: &'a str,
    client_public_key: &'a str,
    application_signature: &'a str,
}

impl Aat {
    /// Digest of the token with its signature cleared.
    pub fn hash(&self) -> Result<[u8; 32], CoreError> {
        let seed = serde_json::to_vec(&AatSeed {
            version: &self.version,
            application_public_key: &self.application_public_key,
            client_public_key: &self.client_public_key,
            application_signature: "",
        })
        .map_err(|e| CoreError::MalformedJson(e.to_string()))?;
        Ok(crypto::hash(&seed))
    }

    /// Hex digest of the token.
    pub fn hash_hex(&self) -> Result<String, CoreError> {
        Ok(hex::encode(self.hash()?))
    }

    /// Full token validation: supported version, well-formed keys, and a
    /// verifying application signature.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !SUPPORTED_TOKEN_VERSIONS.contains(&self.version.as_str()) {
            return Err(CoreError::InvalidAat(format!(
                "unsupported token version {:?}",
                self.version
            )));
        }
        for key in [&self.application_public_key, &self.client_public_key] {
            let decoded = hex::decode(key)
                .map_err(|_| CoreError::InvalidAat("malformed token key".to_string()))?;
            if decoded.len() != PUBLIC_KEY_SIZE {
                return Err(CoreError::InvalidAat("token key must be 32 bytes".to_string()));
            }
        }
        let digest = self.hash()?;
        crypto::verify(
            &self.application_public_key,
            &self.application_signature,
            &digest,
        )
        .map_err(|_| CoreError::InvalidAppSignature)?;
        Ok(())
    }
}
