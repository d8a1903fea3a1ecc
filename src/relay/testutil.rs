// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared test fixtures for relay construction.
//!
//! Building a valid relay takes three keypairs and two signatures in the
//! right order (token first, then the proof over the signed token); the
//! fixture does that once so individual tests stay focused.

use crate::crypto::NodeKeys;

use super::aat::Aat;
use super::proof::RelayProof;
use super::types::{Payload, Relay, RelayMeta};

/// An AAT issued by `app` to `client`.
pub(crate) fn signed_aat(app: &NodeKeys, client: &NodeKeys) -> Aat {
    let mut token = Aat {
        version: "0.0.1".to_string(),
        application_public_key: app.public_key_hex(),
        client_public_key: client.public_key_hex(),
        application_signature: String::new(),
    };
    token.application_signature = app.sign(&token.hash().expect("token digest"));
    token
}

/// Application, client, and servicer keys plus a relay builder wired to
/// produce fully signed relays against chain `"0001"`.
pub(crate) struct RelayFixture {
    pub node: NodeKeys,
    pub app: NodeKeys,
    pub client: NodeKeys,
}

impl RelayFixture {
    pub fn new() -> Self {
        Self {
            node: NodeKeys::generate(),
            app: NodeKeys::generate(),
            client: NodeKeys::generate(),
        }
    }

    /// A fully signed relay with entropy 1 at session height 1.
    pub fn relay(&self) -> Relay {
        self.relay_with(1, 1, 1)
    }

    /// A fully signed relay with the given entropy, meta height, and
    /// session height.
    pub fn relay_with(&self, entropy: i64, meta_height: i64, session_height: i64) -> Relay {
        self.relay_on("0001", entropy, meta_height, session_height)
    }

    /// A fully signed relay targeting an arbitrary chain.
    pub fn relay_on(
        &self,
        chain: &str,
        entropy: i64,
        meta_height: i64,
        session_height: i64,
    ) -> Relay {
        let mut relay = Relay {
            payload: Payload {
                data: r#"{"jsonrpc":"2.0","method":"web3_sha3","params":["0x68656c6c6f20776f726c64"],"id":64}"#
                    .to_string(),
                method: String::new(),
                path: String::new(),
                headers: None,
            },
            meta: RelayMeta {
                block_height: meta_height,
            },
            proof: RelayProof {
                entropy,
                session_block_height: session_height,
                servicer_public_key: self.node.public_key_hex(),
                blockchain: chain.to_string(),
                token: signed_aat(&self.app, &self.client),
                signature: String::new(),
                request_hash: String::new(),
            },
        };
        relay.proof.request_hash = relay.request_hash_hex().expect("request digest");
        let digest = relay.proof.hash().expect("proof digest");
        relay.proof.signature = self.client.sign(&digest);
        relay
    }
}
