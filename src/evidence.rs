// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Proof Store
//!
//! Keeps the evidence of served relays until settlement drains it. Two
//! logical maps, both partitioned by [`SessionHeader`]:
//!
//! - the ordered sequence of proofs recorded for the session
//! - a uniqueness index over `(entropy, session_block_height, servicer)`
//!
//! Locking is striped: a fixed pool of mutexes indexed by the header's hash,
//! so all mutations of one header are serialized while different headers
//! interleave freely. [`EvidenceStore::admit`] runs the uniqueness check and
//! the count-vs-allowance check under a single lock acquisition, which is
//! what makes the two checks one linearizable operation.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use crate::error::CoreError;
use crate::relay::RelayProof;
use crate::session::SessionHeader;

/// Number of lock stripes.
const STRIPE_COUNT: usize = 16;

/// Uniqueness key of one proof within a session.
pub type ProofKey = (i64, i64, String);

#[derive(Default)]
struct Evidence {
    proofs: Vec<RelayProof>,
    seen: HashSet<ProofKey>,
}

/// Process-scoped store of relay evidence.
///
/// Append-only from the pipeline's perspective; settlement consumes entire
/// sessions through [`EvidenceStore::drain`].
pub struct EvidenceStore {
    stripes: Vec<Mutex<HashMap<SessionHeader, Evidence>>>,
}

impl Default for EvidenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EvidenceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            stripes: (0..STRIPE_COUNT)
                .map(|_| Mutex::new(HashMap::new()))
                .collect(),
        }
    }

    fn stripe(&self, header: &SessionHeader) -> &Mutex<HashMap<SessionHeader, Evidence>> {
        let mut hasher = DefaultHasher::new();
        header.hash(&mut hasher);
        &self.stripes[(hasher.finish() as usize) % STRIPE_COUNT]
    }

    /// Whether no proof with the same `(entropy, height, servicer)` triple
    /// has been recorded for this header yet.
    pub fn is_unique(&self, header: &SessionHeader, proof: &RelayProof) -> bool {
        match self.stripe(header).lock() {
            Ok(map) => map
                .get(header)
                .map_or(true, |e| !e.seen.contains(&proof.evidence_key())),
            Err(_) => false,
        }
    }

    /// Number of proofs recorded for this header.
    pub fn count(&self, header: &SessionHeader) -> i64 {
        match self.stripe(header).lock() {
            Ok(map) => map.get(header).map_or(0, |e| e.proofs.len() as i64),
            Err(_) => 0,
        }
    }

    /// Admission check for a relay: uniqueness first, then the session
    /// relay allowance, both under one lock so the count cannot move
    /// between the two checks.
    pub fn admit(
        &self,
        header: &SessionHeader,
        proof: &RelayProof,
        max_relays_per_session: f64,
    ) -> Result<(), CoreError> {
        let map = self
            .stripe(header)
            .lock()
            .map_err(|_| CoreError::CacheCorrupt("evidence stripe poisoned".to_string()))?;
        if let Some(evidence) = map.get(header) {
            if evidence.seen.contains(&proof.evidence_key()) {
                return Err(CoreError::DuplicateProof);
            }
            if evidence.proofs.len() as f64 >= max_relays_per_session {
                return Err(CoreError::OverService);
            }
        } else if max_relays_per_session <= 0.0 {
            return Err(CoreError::OverService);
        }
        Ok(())
    }

    /// Record a proof. Fails with [`CoreError::DuplicateProof`] if the
    /// `(entropy, height, servicer)` triple is already present.
    pub fn insert(&self, header: &SessionHeader, proof: RelayProof) -> Result<(), CoreError> {
        let mut map = self
            .stripe(header)
            .lock()
            .map_err(|_| CoreError::CacheCorrupt("evidence stripe poisoned".to_string()))?;
        let evidence = map.entry(header.clone()).or_default();
        if !evidence.seen.insert(proof.evidence_key()) {
            return Err(CoreError::DuplicateProof);
        }
        evidence.proofs.push(proof);
        Ok(())
    }

    /// Remove and return every proof recorded for this header, in insertion
    /// order. Settlement calls this when it claims the session.
    pub fn drain(&self, header: &SessionHeader) -> Vec<RelayProof> {
        match self.stripe(header).lock() {
            Ok(mut map) => map.remove(header).map(|e| e.proofs).unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }
}
