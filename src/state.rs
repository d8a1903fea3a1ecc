// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Application State
//!
//! This module defines the shared application state that is passed to all
//! Axum request handlers via the `State` extractor.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           AppState                               │
//! │  ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────┐  │
//! │  │ Arc<CoreConfig>  │ │ Arc<dyn State-   │ │ Arc<NodeKeys>    │  │
//! │  │ frozen at init   │ │ Accessor> ledger │ │ servicer keypair │  │
//! │  └──────────────────┘ └──────────────────┘ └──────────────────┘  │
//! │  ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────┐  │
//! │  │ HostedBlockchains│ │ SessionCache     │ │ EvidenceStore    │  │
//! │  │ immutable        │ │ bounded LRU      │ │ striped locks    │  │
//! │  └──────────────────┘ └──────────────────┘ └──────────────────┘  │
//! │  ┌──────────────────┐ ┌──────────────────┐                       │
//! │  │ UpstreamExecutor │ │ Semaphore        │                       │
//! │  │ shared client    │ │ relay permits    │                       │
//! │  └──────────────────┘ └──────────────────┘                       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Thread Safety
//!
//! `AppState` is `Clone` and `Send + Sync`: every field is behind an `Arc`,
//! the registries are immutable after construction, and the cache and proof
//! store synchronize internally. Handlers never take a lock themselves.

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::chains::HostedBlockchains;
use crate::config::CoreConfig;
use crate::crypto::NodeKeys;
use crate::error::CoreError;
use crate::evidence::EvidenceStore;
use crate::ledger::StateAccessor;
use crate::relay::UpstreamExecutor;
use crate::session::SessionCache;

/// Shared application state for all request handlers.
///
/// ## Example
///
/// ```rust,ignore
/// async fn my_handler(
///     State(state): State<AppState>,
/// ) -> Result<Json<Data>, ApiError> {
///     let height = state.ledger.current_block_height();
///     // ...
/// }
/// ```
#[derive(Clone)]
pub struct AppState {
    /// Immutable node configuration, frozen at startup.
    pub config: Arc<CoreConfig>,
    /// Read-only view of the consensus state.
    pub ledger: Arc<dyn StateAccessor>,
    /// Registry of chains this node proxies to.
    pub chains: Arc<HostedBlockchains>,
    /// Bounded cache of derived sessions.
    pub sessions: Arc<SessionCache>,
    /// Evidence of served relays, pending settlement.
    pub evidence: Arc<EvidenceStore>,
    /// This node's servicer keypair.
    pub keys: Arc<NodeKeys>,
    /// Shared upstream HTTP forwarder.
    pub executor: Arc<UpstreamExecutor>,
    /// In-flight relay permits; exhaustion means the node is too busy.
    pub relay_permits: Arc<Semaphore>,
}

impl AppState {
    /// Build the full state from configuration, a ledger accessor, and the
    /// node's keys.
    ///
    /// Fails when the hosted-chains registry or the upstream client cannot
    /// be constructed, so a misconfigured node stops at startup.
    pub fn new(
        config: CoreConfig,
        ledger: Arc<dyn StateAccessor>,
        keys: NodeKeys,
    ) -> Result<Self, CoreError> {
        let chains = HostedBlockchains::from_entries(config.pocketcore.hosted_chains.clone())?;
        let executor = UpstreamExecutor::new(
            config.upstream_timeout(),
            config.pocketcore.sort_json_responses,
        )?;
        let sessions = SessionCache::new(config.pocketcore.session_cache_capacity);
        let relay_permits = Semaphore::new(config.pocketcore.max_concurrent_relays.max(1));

        Ok(Self {
            config: Arc::new(config),
            ledger,
            chains: Arc::new(chains),
            sessions: Arc::new(sessions),
            evidence: Arc::new(EvidenceStore::new()),
            keys: Arc::new(keys),
            executor: Arc::new(executor),
            relay_permits: Arc::new(relay_permits),
        })
    }
}
