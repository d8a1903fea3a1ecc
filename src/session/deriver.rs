// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session derivation.
//!
//! A pure function of (header, epoch block hash, staked validator set,
//! session size): every node computing a session for the same inputs must
//! produce the identical ordered node set, because reward accounting and
//! dispatch answers both hang off this ordering.

use crate::crypto;
use crate::error::CoreError;
use crate::ledger::Validator;

use super::{Session, SessionHeader};

/// Compute the session key: SHA-256 over the raw application key, the raw
/// chain identifier, and the epoch block hash, in that order.
pub fn session_key(header: &SessionHeader, block_hash: &[u8; 32]) -> Result<[u8; 32], CoreError> {
    let app_key = hex::decode(&header.application_public_key)
        .map_err(|_| CoreError::InvalidSession("malformed application key".to_string()))?;
    let chain = hex::decode(&header.blockchain)
        .map_err(|_| CoreError::UnsupportedBlockchain(header.blockchain.clone()))?;

    let mut seed = Vec::with_capacity(app_key.len() + chain.len() + block_hash.len());
    seed.extend_from_slice(&app_key);
    seed.extend_from_slice(&chain);
    seed.extend_from_slice(block_hash);
    Ok(crypto::hash(&seed))
}

/// XOR distance between the session key and a node, interpreted as an
/// unsigned big-endian integer (byte-wise comparison gives that order).
fn distance(session_key: &[u8; 32], node_key: &[u8]) -> [u8; 32] {
    let mut seed = Vec::with_capacity(node_key.len() + session_key.len());
    seed.extend_from_slice(node_key);
    seed.extend_from_slice(session_key);
    let node_digest = crypto::hash(&seed);

    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = session_key[i] ^ node_digest[i];
    }
    out
}

/// Derive the ordered session for `header`.
///
/// Candidates are the staked, unjailed validators serving the header's
/// chain; they are ordered by ascending XOR distance to the session key,
/// with ties broken by ascending address so the ordering is total on every
/// node. Exactly `size` nodes are returned.
pub fn derive(
    header: &SessionHeader,
    block_hash: [u8; 32],
    validators: &[Validator],
    size: usize,
) -> Result<Session, CoreError> {
    let key = session_key(header, &block_hash)?;

    let mut candidates: Vec<(&Validator, [u8; 32])> = validators
        .iter()
        .filter(|v| v.is_staked() && !v.jailed && v.serves_chain(&header.blockchain))
        .filter_map(|v| {
            // A validator whose key does not decode cannot be measured
            // against the session key; it is out of the pool on every node.
            let node_key = hex::decode(&v.public_key).ok()?;
            Some((v, distance(&key, &node_key)))
        })
        .collect();

    if candidates.len() < size {
        return Err(CoreError::InsufficientNodes {
            available: candidates.len(),
            required: size,
        });
    }

    candidates.sort_by(|a, b| {
        a.1.cmp(&b.1)
            .then_with(|| a.0.address.as_bytes().cmp(b.0.address.as_bytes()))
    });

    Ok(Session {
        header: header.clone(),
        key: hex::encode(key),
        nodes: candidates
            .into_iter()
            .take(size)
            .map(|(v, _)| v.clone())
            .collect(),
    })
}
