// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Challenge proofs.
//!
//! A client that collected conflicting answers for the same relay from
//! different servicers can submit them as a challenge: two signed responses
//! that agree (the majority) and one that disagrees (the minority). The node
//! validates the bundle; turning an accepted challenge into an on-chain
//! burn is settlement's concern.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::crypto::{self, ADDRESS_SIZE};
use crate::error::CoreError;
use crate::session::SessionHeader;

use super::types::RelayResponse;

/// Number of agreeing responses a challenge must carry.
pub const MAJORITY_RESPONSES: usize = 2;

/// Evidence that one servicer answered a relay differently than the
/// majority of its session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChallengeProofInvalidData {
    /// The two agreeing responses.
    pub majority_responses: Vec<RelayResponse>,
    /// The conflicting response under challenge.
    pub minority_response: RelayResponse,
    /// Address of the node reporting the conflict.
    pub reporter_address: String,
}

/// Acknowledgement returned for an accepted challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChallengeResponse {
    pub response: String,
}

impl ChallengeProofInvalidData {
    /// Validate the challenge bundle:
    ///
    /// 1. exactly two majority responses and a well-formed reporter address
    /// 2. all three responses belong to the same session header
    /// 3. every response signature verifies against its servicer key
    /// 4. the majority agrees with itself and conflicts with the minority
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.majority_responses.len() != MAJORITY_RESPONSES {
            return Err(CoreError::InvalidChallenge(format!(
                "expected {MAJORITY_RESPONSES} majority responses, got {}",
                self.majority_responses.len()
            )));
        }
        let reporter = hex::decode(&self.reporter_address)
            .map_err(|_| CoreError::InvalidChallenge("malformed reporter address".to_string()))?;
        if reporter.len() != ADDRESS_SIZE {
            return Err(CoreError::InvalidChallenge(
                "reporter address must be 20 bytes".to_string(),
            ));
        }

        let header = session_of(&self.minority_response);
        for response in self.responses() {
            if session_of(response) != header {
                return Err(CoreError::InvalidChallenge(
                    "responses span different sessions".to_string(),
                ));
            }
            let digest = response.hash()?;
            crypto::verify(
                &response.proof.servicer_public_key,
                &response.signature,
                &digest,
            )
            .map_err(|_| {
                CoreError::InvalidChallenge("response signature does not verify".to_string())
            })?;
        }

        if self.majority_responses[0].response != self.majority_responses[1].response {
            return Err(CoreError::InvalidChallenge(
                "majority responses do not agree".to_string(),
            ));
        }
        if self.minority_response.response == self.majority_responses[0].response {
            return Err(CoreError::InvalidChallenge(
                "minority response does not conflict with the majority".to_string(),
            ));
        }
        Ok(())
    }

    fn responses(&self) -> impl Iterator<Item = &RelayResponse> {
        self.majority_responses
            .iter()
            .chain(std::iter::once(&self.minority_response))
    }
}

fn session_of(response: &RelayResponse) -> SessionHeader {
    SessionHeader {
        application_public_key: response.proof.token.application_public_key.clone(),
        blockchain: response.proof.blockchain.clone(),
        session_block_height: response.proof.session_block_height,
    }
}
