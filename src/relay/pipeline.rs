// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The relay servicing pipeline and the dispatch query.
//!
//! [`serve_relay`] is the node's core entrypoint: take a backpressure
//! permit, run the ordered validation chain, forward the payload upstream,
//! record the proof, and sign the response. Validation happens before any
//! upstream I/O, and no proof is recorded unless the upstream call
//! succeeded.
//!
//! [`dispatch_session`] answers a client's "where do I send my relay" query
//! from the same session deriver and cache, without touching the executor
//! or the proof store.

use crate::error::CoreError;
use crate::session::{self, deriver, Session, SessionHeader};
use crate::state::AppState;

use super::types::{DispatchResponse, Relay, RelayResponse, DEFAULT_HTTP_METHOD};

/// Serve one relay end to end.
pub async fn serve_relay(state: &AppState, mut relay: Relay) -> Result<RelayResponse, CoreError> {
    let _permit = state
        .relay_permits
        .try_acquire()
        .map_err(|_| CoreError::TooBusy)?;

    let evidence_header = admit_relay(state, &mut relay)?;

    let chain = state.chains.get(&relay.proof.blockchain)?;
    let body = state.executor.execute(&relay.payload, chain).await?;

    state
        .evidence
        .insert(&evidence_header, relay.proof.clone())?;

    let mut response = RelayResponse {
        signature: String::new(),
        response: body,
        proof: relay.proof,
    };
    let digest = response.hash()?;
    response.signature = state.keys.sign(&digest);
    response.validate()?;

    tracing::debug!(
        session = %evidence_header.fingerprint(),
        proof = %response.proof.fingerprint(),
        relays = state.evidence.count(&evidence_header),
        "relay served"
    );
    Ok(response)
}

/// The ordered validation chain. Returns the evidence header the proof is
/// recorded under once the upstream call succeeds.
///
/// The uniqueness and allowance checks run as one linearizable operation
/// through the evidence store; everything else is read-only.
fn admit_relay(state: &AppState, relay: &mut Relay) -> Result<SessionHeader, CoreError> {
    relay.payload.validate()?;

    let current_height = state.ledger.current_block_height();
    relay
        .meta
        .validate(current_height, state.ledger.client_block_allowance())?;

    if relay.proof.request_hash != relay.request_hash_hex()? {
        return Err(CoreError::RequestHashMismatch);
    }
    if !state.chains.contains(&relay.proof.blockchain) {
        return Err(CoreError::UnsupportedBlockchain(
            relay.proof.blockchain.clone(),
        ));
    }

    let evidence_header = relay.evidence_header();
    let app = state
        .ledger
        .app_by_public_key(&relay.proof.token.application_public_key)
        .ok_or_else(|| CoreError::InvalidSession("unknown application".to_string()))?;
    let allowance = relay_allowance(
        app.max_relays,
        app.chains.len(),
        state.ledger.session_node_count(),
    );
    state
        .evidence
        .admit(&evidence_header, &relay.proof, allowance)?;

    let session_height =
        session::session_block_height(current_height, state.ledger.blocks_per_session());
    relay
        .proof
        .validate_local(&app.chains, session_height, &state.keys.public_key_hex())?;

    let header = SessionHeader {
        application_public_key: app.public_key.clone(),
        blockchain: relay.proof.blockchain.clone(),
        session_block_height: session_height,
    };
    let session = fetch_or_derive_session(state, &header)?;
    if session.header.application_public_key != app.public_key {
        return Err(CoreError::InvalidSession(
            "session does not belong to the application".to_string(),
        ));
    }
    if !session.contains(&state.keys.address()) {
        return Err(CoreError::InvalidSession(
            "this node is not in the derived session".to_string(),
        ));
    }

    if relay.payload.method.is_empty() {
        relay.payload.method = DEFAULT_HTTP_METHOD.to_string();
    }
    Ok(evidence_header)
}

/// Answer a dispatch query: where does the application's session live right
/// now.
pub fn dispatch_session(
    state: &AppState,
    header: SessionHeader,
) -> Result<DispatchResponse, CoreError> {
    header
        .validate()
        .map_err(|e| CoreError::InvalidSessionDispatch(e.to_string()))?;

    let app = state
        .ledger
        .app_by_public_key(&header.application_public_key)
        .ok_or_else(|| CoreError::InvalidSessionDispatch("unknown application".to_string()))?;
    if !app.chains.iter().any(|c| c == &header.blockchain) {
        return Err(CoreError::InvalidSessionDispatch(format!(
            "application is not staked for blockchain {}",
            header.blockchain
        )));
    }

    let current_height = state.ledger.current_block_height();
    let clamped = SessionHeader {
        session_block_height: session::session_block_height(
            current_height,
            state.ledger.blocks_per_session(),
        ),
        ..header
    };
    let session = fetch_or_derive_session(state, &clamped)?;
    Ok(DispatchResponse {
        session,
        block_height: current_height,
    })
}

/// Fetch the session for a header from the cache, deriving and caching it
/// on a miss.
pub fn fetch_or_derive_session(
    state: &AppState,
    header: &SessionHeader,
) -> Result<Session, CoreError> {
    if let Some(session) = state.sessions.get(header) {
        return Ok(session);
    }
    let block_hash = state.ledger.block_hash_at(header.session_block_height)?;
    let validators = state
        .ledger
        .staked_validators_at(header.session_block_height)?;
    let session = deriver::derive(
        header,
        block_hash,
        &validators,
        state.ledger.session_node_count(),
    )?;
    state.sessions.put(session.clone());
    Ok(session)
}

/// Per-session relay allowance: `ceil(max_relays / chains) / N`, evaluated
/// in floating point so fractional caps round against the servicer.
pub fn relay_allowance(max_relays: i64, chain_count: usize, session_node_count: usize) -> f64 {
    if chain_count == 0 || session_node_count == 0 {
        return 0.0;
    }
    (max_relays as f64 / chain_count as f64).ceil() / session_node_count as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::routing::post;
    use axum::Router;

    use crate::chains::HostedBlockchain;
    use crate::config::CoreConfig;
    use crate::crypto::{self, NodeKeys};
    use crate::ledger::{Application, LedgerSnapshot, StaticLedger, Validator};
    use crate::relay::testutil::RelayFixture;

    const UPSTREAM_ANSWER: &str =
        "0x47173285a8d7341e5e972fc677286384f802f8ef42a5ec5f03bbfa254cb01fad";

    async fn spawn_upstream(hits: Arc<AtomicUsize>) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = Router::new().route(
            "/",
            post(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    UPSTREAM_ANSWER
                }
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    struct Harness {
        max_relays: i64,
        height: i64,
        allowance: i64,
        include_self: bool,
    }

    impl Default for Harness {
        fn default() -> Self {
            Self {
                max_relays: 1000,
                height: 1,
                allowance: 1,
                include_self: true,
            }
        }
    }

    impl Harness {
        fn build(&self, fx: &RelayFixture, upstream: Option<SocketAddr>) -> AppState {
            let service_url = "https://node.example:443";
            let chains = vec!["0001".to_string(), "0002".to_string()];
            let mut validators: Vec<Validator> = (0..4)
                .map(|_| {
                    Validator::new(
                        NodeKeys::generate().public_key_hex(),
                        chains.clone(),
                        service_url,
                    )
                })
                .collect();
            let fifth = if self.include_self {
                fx.node.public_key_hex()
            } else {
                NodeKeys::generate().public_key_hex()
            };
            validators.push(Validator::new(fifth, chains, service_url));

            let ledger = StaticLedger::from_snapshot(LedgerSnapshot {
                height: self.height,
                blocks_per_session: 4,
                session_node_count: 5,
                client_block_allowance: self.allowance,
                validators,
                applications: vec![Application::new(
                    fx.app.public_key_hex(),
                    vec!["0001".to_string()],
                    self.max_relays,
                )],
            });

            let mut config = CoreConfig::default();
            config.pocketcore.client_block_allowance = self.allowance;
            if let Some(addr) = upstream {
                config.pocketcore.hosted_chains = vec![HostedBlockchain {
                    id: "0001".to_string(),
                    url: format!("http://{addr}"),
                    basic_auth: None,
                }];
            }
            AppState::new(config, Arc::new(ledger), fx.node.clone()).unwrap()
        }
    }

    #[tokio::test]
    async fn happy_relay_is_served_recorded_and_signed() {
        let fx = RelayFixture::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let upstream = spawn_upstream(hits.clone()).await;
        let state = Harness::default().build(&fx, Some(upstream));

        let relay = fx.relay();
        let header = relay.evidence_header();
        let response = serve_relay(&state, relay).await.unwrap();

        assert_eq!(response.response, UPSTREAM_ANSWER);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(state.evidence.count(&header), 1);

        // the signature covers the response with its signature cleared
        let mut unsigned = response.clone();
        unsigned.signature = String::new();
        assert!(crypto::verify(
            &fx.node.public_key_hex(),
            &response.signature,
            &unsigned.hash().unwrap()
        )
        .is_ok());
    }

    #[tokio::test]
    async fn unsupported_blockchain_fails_before_any_upstream_io() {
        let fx = RelayFixture::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let upstream = spawn_upstream(hits.clone()).await;
        let state = Harness::default().build(&fx, Some(upstream));

        let relay = fx.relay_on("0002", 1, 1, 1);
        let header = relay.evidence_header();
        assert!(matches!(
            serve_relay(&state, relay).await,
            Err(CoreError::UnsupportedBlockchain(_))
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(state.evidence.count(&header), 0);
    }

    #[tokio::test]
    async fn replayed_relay_is_a_duplicate_proof() {
        let fx = RelayFixture::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let upstream = spawn_upstream(hits.clone()).await;
        let state = Harness::default().build(&fx, Some(upstream));

        let relay = fx.relay();
        let header = relay.evidence_header();
        serve_relay(&state, relay.clone()).await.unwrap();

        assert!(matches!(
            serve_relay(&state, relay).await,
            Err(CoreError::DuplicateProof)
        ));
        assert_eq!(state.evidence.count(&header), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn third_relay_over_the_session_allowance_is_rejected() {
        let fx = RelayFixture::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let upstream = spawn_upstream(hits.clone()).await;
        // max_relays 10 over 1 chain and 5 nodes: 2 relays per session
        let state = Harness {
            max_relays: 10,
            ..Harness::default()
        }
        .build(&fx, Some(upstream));

        serve_relay(&state, fx.relay_with(1, 1, 1)).await.unwrap();
        serve_relay(&state, fx.relay_with(2, 1, 1)).await.unwrap();
        assert!(matches!(
            serve_relay(&state, fx.relay_with(3, 1, 1)).await,
            Err(CoreError::OverService)
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn client_height_outside_the_allowance_is_out_of_sync() {
        let fx = RelayFixture::new();
        let state = Harness {
            height: 100,
            allowance: 5,
            ..Harness::default()
        }
        .build(&fx, None);

        // current session epoch at height 100 with 4-block sessions is 97
        assert!(matches!(
            serve_relay(&state, fx.relay_with(1, 120, 97)).await,
            Err(CoreError::OutOfSyncRequest {
                client: 120,
                node: 100
            })
        ));
        for beyond in [94, 106] {
            assert!(matches!(
                serve_relay(&state, fx.relay_with(1, beyond, 97)).await,
                Err(CoreError::OutOfSyncRequest { .. })
            ));
        }
        // heights at the window edge pass the meta check and fail later on
        // the missing hosted chain, not on sync
        for edge in [95, 105] {
            assert!(matches!(
                serve_relay(&state, fx.relay_with(1, edge, 97)).await,
                Err(CoreError::UnsupportedBlockchain(_))
            ));
        }
    }

    #[tokio::test]
    async fn node_outside_the_derived_session_cannot_serve() {
        let fx = RelayFixture::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let upstream = spawn_upstream(hits.clone()).await;
        let state = Harness {
            include_self: false,
            ..Harness::default()
        }
        .build(&fx, Some(upstream));

        assert!(matches!(
            serve_relay(&state, fx.relay()).await,
            Err(CoreError::InvalidSession(_))
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhausted_permits_surface_too_busy() {
        let fx = RelayFixture::new();
        let state = Harness::default().build(&fx, None);

        let _held: Vec<_> = (0..state.config.pocketcore.max_concurrent_relays)
            .map(|_| state.relay_permits.try_acquire().unwrap())
            .collect();
        assert!(matches!(
            serve_relay(&state, fx.relay()).await,
            Err(CoreError::TooBusy)
        ));
    }

    #[tokio::test]
    async fn dispatch_is_deterministic_across_nodes() {
        let fx = RelayFixture::new();
        // two independent nodes over the same snapshot: separate caches,
        // same derivation inputs
        let chains = vec!["0001".to_string()];
        let mut validators: Vec<Validator> = (0..4)
            .map(|_| {
                Validator::new(
                    NodeKeys::generate().public_key_hex(),
                    chains.clone(),
                    "https://node.example:443",
                )
            })
            .collect();
        validators.push(Validator::new(
            fx.node.public_key_hex(),
            chains.clone(),
            "https://node.example:443",
        ));
        let snapshot = LedgerSnapshot {
            height: 1,
            blocks_per_session: 4,
            session_node_count: 5,
            client_block_allowance: 1,
            validators,
            applications: vec![Application::new(fx.app.public_key_hex(), chains, 1000)],
        };
        let state_a = AppState::new(
            CoreConfig::default(),
            Arc::new(StaticLedger::from_snapshot(snapshot.clone())),
            fx.node.clone(),
        )
        .unwrap();
        let state_b = AppState::new(
            CoreConfig::default(),
            Arc::new(StaticLedger::from_snapshot(snapshot)),
            NodeKeys::generate(),
        )
        .unwrap();

        let header = SessionHeader {
            application_public_key: fx.app.public_key_hex(),
            blockchain: "0001".to_string(),
            session_block_height: 1,
        };
        let a = dispatch_session(&state_a, header.clone()).unwrap();
        let b = dispatch_session(&state_b, header).unwrap();

        assert_eq!(a.session.nodes, b.session.nodes);
        assert_eq!(a.session.key, b.session.key);
        assert_eq!(a.block_height, 1);
        assert_eq!(a.session.nodes.len(), 5);
    }

    #[tokio::test]
    async fn dispatch_clamps_the_height_to_the_current_epoch() {
        let fx = RelayFixture::new();
        let state = Harness {
            height: 6,
            ..Harness::default()
        }
        .build(&fx, None);

        let header = SessionHeader {
            application_public_key: fx.app.public_key_hex(),
            blockchain: "0001".to_string(),
            session_block_height: 3,
        };
        let response = dispatch_session(&state, header).unwrap();
        // epoch of height 6 with 4-block sessions starts at 5
        assert_eq!(response.session.header.session_block_height, 5);
        assert_eq!(response.block_height, 6);
    }

    #[tokio::test]
    async fn dispatch_rejects_unknown_apps_and_unstaked_chains() {
        let fx = RelayFixture::new();
        let state = Harness::default().build(&fx, None);

        let unknown = SessionHeader {
            application_public_key: NodeKeys::generate().public_key_hex(),
            blockchain: "0001".to_string(),
            session_block_height: 1,
        };
        assert!(matches!(
            dispatch_session(&state, unknown),
            Err(CoreError::InvalidSessionDispatch(_))
        ));

        let unstaked = SessionHeader {
            application_public_key: fx.app.public_key_hex(),
            blockchain: "0002".to_string(),
            session_block_height: 1,
        };
        assert!(matches!(
            dispatch_session(&state, unstaked),
            Err(CoreError::InvalidSessionDispatch(_))
        ));
    }

    #[tokio::test]
    async fn sessions_are_cached_after_the_first_derivation() {
        let fx = RelayFixture::new();
        let state = Harness::default().build(&fx, None);

        let header = SessionHeader {
            application_public_key: fx.app.public_key_hex(),
            blockchain: "0001".to_string(),
            session_block_height: 1,
        };
        assert!(state.sessions.get(&header).is_none());
        let first = fetch_or_derive_session(&state, &header).unwrap();
        assert_eq!(state.sessions.get(&header), Some(first.clone()));
        assert_eq!(fetch_or_derive_session(&state, &header).unwrap(), first);
    }

    #[test]
    fn allowance_arithmetic_matches_the_protocol() {
        assert_eq!(relay_allowance(10, 1, 5), 2.0);
        assert_eq!(relay_allowance(1000, 1, 5), 200.0);
        // fractional caps stay fractional: one relay exhausts ceil(10/3)/5
        let fractional = relay_allowance(10, 3, 5);
        assert!(fractional > 0.0 && fractional < 1.0);
        assert_eq!(relay_allowance(10, 0, 5), 0.0);
        assert_eq!(relay_allowance(10, 1, 0), 0.0);
    }
}
