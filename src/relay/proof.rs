// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relay proofs.
//!
//! A [`RelayProof`] is the client-signed receipt that accompanies every
//! relay: it pins the request (via the request hash) to a session, a
//! servicer, and a client-chosen entropy, and carries the AAT that entitles
//! the client to spend the application's relay allowance.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::crypto;
use crate::error::CoreError;

use super::aat::Aat;

/// The node-side receipt of one relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RelayProof {
    /// Client-chosen nonce; fresh entropy makes a retry a new relay.
    pub entropy: i64,
    /// Session epoch this relay is pinned to.
    pub session_block_height: i64,
    /// Public key of the servicer the client selected.
    pub servicer_public_key: String,
    /// Network identifier of the target chain.
    pub blockchain: String,
    /// The authority token entitling the client.
    pub token: Aat,
    /// Client signature over the proof digest, hex.
    pub signature: String,
    /// Hex digest of the relay's payload and meta.
    pub request_hash: String,
}

/// Canonical form hashed for the client signature: the proof's signature is
/// replaced by the empty string; the token keeps its own signature since it
/// is part of what the client endorses.
#[derive(Serialize)]
struct ProofSeed<'a> {
    entropy: i64,
    session_block_height: i64,
    servicer_public_key: &'a str,
    blockchain: &'a str,
    token: &'a Aat,
    signature: &'a str,
    request_hash: &'a str,
}

impl RelayProof {
    /// Digest of the proof with its signature cleared.
    pub fn hash(&self) -> Result<[u8; 32], CoreError> {
        let seed = serde_json::to_vec(&ProofSeed {
            entropy: self.entropy,
            session_block_height: self.session_block_height,
            servicer_public_key: &self.servicer_public_key,
            blockchain: &self.blockchain,
            token: &self.token,
            signature: "",
            request_hash: &self.request_hash,
        })
        .map_err(|e| CoreError::MalformedJson(e.to_string()))?;
        Ok(crypto::hash(&seed))
    }

    /// Hex digest of the proof.
    pub fn hash_hex(&self) -> Result<String, CoreError> {
        Ok(hex::encode(self.hash()?))
    }

    /// Uniqueness key within a session: (entropy, height, servicer).
    pub fn evidence_key(&self) -> (i64, i64, String) {
        (
            self.entropy,
            self.session_block_height,
            self.servicer_public_key.clone(),
        )
    }

    /// Compact representation for log lines. Never includes the token or
    /// any signature material.
    pub fn fingerprint(&self) -> String {
        let servicer = self
            .servicer_public_key
            .get(..8)
            .unwrap_or(&self.servicer_public_key);
        format!(
            "{}:{}@{}",
            servicer, self.entropy, self.session_block_height
        )
    }

    /// Local validation of the proof against this node's identity and the
    /// application's stake, in order:
    ///
    /// 1. the proof names this node as servicer
    /// 2. the chain is one the application staked for
    /// 3. the proof is pinned to the current session epoch
    /// 4. the AAT validates (version, keys, application signature)
    /// 5. the client signature verifies over the proof digest
    pub fn validate_local(
        &self,
        app_chains: &[String],
        session_block_height: i64,
        node_public_key: &str,
    ) -> Result<(), CoreError> {
        if self.servicer_public_key != node_public_key {
            return Err(CoreError::ServicerMismatch);
        }
        if !app_chains.iter().any(|c| c == &self.blockchain) {
            return Err(CoreError::UnsupportedBlockchain(self.blockchain.clone()));
        }
        if self.session_block_height != session_block_height {
            return Err(CoreError::InvalidSession(format!(
                "proof height {} is not the current session epoch {}",
                self.session_block_height, session_block_height
            )));
        }
        self.token.validate()?;
        let digest = self.hash()?;
        crypto::verify(&self.token.client_public_key, &self.signature, &digest)
            .map_err(|_| CoreError::InvalidClientSignature)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::NodeKeys;
    use crate::relay::testutil::RelayFixture;

    #[test]
    fn hash_ignores_the_signature_field() {
        let fx = RelayFixture::new();
        let proof = fx.relay().proof;
        let mut unsigned = proof.clone();
        unsigned.signature = String::new();
        assert_eq!(proof.hash().unwrap(), unsigned.hash().unwrap());
    }

    #[test]
    fn valid_proof_passes_local_validation() {
        let fx = RelayFixture::new();
        let relay = fx.relay();
        assert!(relay
            .proof
            .validate_local(&["0001".to_string()], 1, &fx.node.public_key_hex())
            .is_ok());
    }

    #[test]
    fn servicer_mismatch_is_detected_first() {
        let fx = RelayFixture::new();
        let relay = fx.relay();
        let other = NodeKeys::generate();
        assert!(matches!(
            relay
                .proof
                .validate_local(&["0001".to_string()], 1, &other.public_key_hex()),
            Err(CoreError::ServicerMismatch)
        ));
    }

    #[test]
    fn chain_outside_the_app_stake_is_rejected() {
        let fx = RelayFixture::new();
        let relay = fx.relay();
        assert!(matches!(
            relay
                .proof
                .validate_local(&["0021".to_string()], 1, &fx.node.public_key_hex()),
            Err(CoreError::UnsupportedBlockchain(_))
        ));
    }

    #[test]
    fn stale_session_height_is_rejected() {
        let fx = RelayFixture::new();
        let relay = fx.relay();
        assert!(matches!(
            relay
                .proof
                .validate_local(&["0001".to_string()], 5, &fx.node.public_key_hex()),
            Err(CoreError::InvalidSession(_))
        ));
    }

    #[test]
    fn tampered_entropy_breaks_the_client_signature() {
        let fx = RelayFixture::new();
        let mut relay = fx.relay();
        relay.proof.entropy += 1;
        assert!(matches!(
            relay
                .proof
                .validate_local(&["0001".to_string()], 1, &fx.node.public_key_hex()),
            Err(CoreError::InvalidClientSignature)
        ));
    }

    #[test]
    fn evidence_key_is_the_entropy_height_servicer_triple() {
        let fx = RelayFixture::new();
        let proof = fx.relay().proof;
        assert_eq!(
            proof.evidence_key(),
            (proof.entropy, 1, fx.node.public_key_hex())
        );
    }

    #[test]
    fn fingerprint_carries_no_signature_material() {
        let fx = RelayFixture::new();
        let proof = fx.relay().proof;
        let fp = proof.fingerprint();
        assert!(!fp.contains(&proof.signature));
        assert!(!fp.contains(&proof.token.application_signature));
    }
}
