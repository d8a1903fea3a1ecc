// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Relay Servicing
//!
//! Everything between an inbound client relay and the signed response:
//!
//! - `types` - the wire types and their canonical digests
//! - `aat` - application authority tokens
//! - `proof` - client-signed relay proofs
//! - `executor` - the upstream HTTP forward
//! - `pipeline` - validate, execute, record, sign
//! - `challenge` - challenge proofs against conflicting responses

pub mod aat;
pub mod challenge;
pub mod executor;
pub mod pipeline;
pub mod proof;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use aat::Aat;
pub use challenge::{ChallengeProofInvalidData, ChallengeResponse};
pub use executor::UpstreamExecutor;
pub use proof::RelayProof;
pub use types::{
    DispatchResponse, Payload, Relay, RelayMeta, RelayResponse, DEFAULT_HTTP_METHOD,
};
