// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Sessions
//!
//! A session is the N-node working set authorized to serve a given
//! (application, blockchain, session height) tuple. This module provides:
//!
//! - [`SessionHeader`], the tuple identifying a session (cache key and proof
//!   partition key)
//! - [`Session`], the derived, ordered working set
//! - the session-epoch arithmetic shared by relay validation and dispatch
//! - the deriver ([`deriver`]) and the bounded cache ([`cache`])

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::chains::validate_network_identifier;
use crate::crypto::PUBLIC_KEY_SIZE;
use crate::error::CoreError;
use crate::ledger::Validator;

pub mod cache;
pub mod deriver;

pub use cache::SessionCache;

/// Identifies one session uniquely.
///
/// Used as the session-cache key and as the partition key for proofs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct SessionHeader {
    /// Public key of the application the session belongs to.
    pub application_public_key: String,
    /// Network identifier of the serviced chain.
    pub blockchain: String,
    /// Floor-aligned height identifying the session epoch.
    pub session_block_height: i64,
}

impl SessionHeader {
    /// Structural validity: well-formed application key, well-formed chain
    /// identifier, positive height.
    pub fn validate(&self) -> Result<(), CoreError> {
        let key_bytes = hex::decode(&self.application_public_key)
            .map_err(|_| CoreError::InvalidSession("malformed application key".to_string()))?;
        if key_bytes.len() != PUBLIC_KEY_SIZE {
            return Err(CoreError::InvalidSession(
                "application key must be 32 bytes".to_string(),
            ));
        }
        validate_network_identifier(&self.blockchain)?;
        if self.session_block_height < 1 {
            return Err(CoreError::InvalidSession(
                "session height must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Compact representation for log lines: truncated app key, chain,
    /// height. Never includes signatures or tokens.
    pub fn fingerprint(&self) -> String {
        let app = self
            .application_public_key
            .get(..8)
            .unwrap_or(&self.application_public_key);
        format!("{}/{}@{}", app, self.blockchain, self.session_block_height)
    }
}

/// The derived working set for one session header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Session {
    /// The tuple this session was derived for.
    pub header: SessionHeader,
    /// Session key: digest over app key, chain, and the epoch block hash.
    pub key: String,
    /// The N nodes authorized to serve this session, in derivation order.
    pub nodes: Vec<Validator>,
}

impl Session {
    /// Whether a node with the given address belongs to this session.
    pub fn contains(&self, address: &str) -> bool {
        self.nodes.iter().any(|n| n.address == address)
    }
}

/// Floor-align a working height to its session epoch (1-based).
///
/// Heights `1..=bps` map to 1, `bps+1..=2*bps` map to `bps+1`, and so on.
pub fn session_block_height(height: i64, blocks_per_session: i64) -> i64 {
    if height < 1 {
        return 1;
    }
    let bps = blocks_per_session.max(1);
    height - ((height - 1) % bps)
}
