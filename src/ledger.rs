// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger State Accessor
//!
//! The consensus and state-machine layer is an external collaborator; the
//! relay core only reads from it. This module defines the narrow capability
//! types the core needs ([`Validator`], [`Application`]), the read interface
//! ([`StateAccessor`]), and an in-memory implementation ([`StaticLedger`])
//! seeded from a JSON snapshot document so the node can run standalone and
//! the pipeline can be exercised end to end in tests.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::crypto;
use crate::error::CoreError;

/// Bonding state of a validator or application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StakeStatus {
    #[default]
    Unstaked,
    Unstaking,
    Staked,
}

/// A service node as the relay core sees it.
///
/// Only the fields the core actually reads; the staking ledger owns the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Validator {
    /// Truncated public-key digest, lowercase hex.
    #[serde(default)]
    pub address: String,
    /// Ed25519 public key, lowercase hex.
    pub public_key: String,
    /// Network identifiers of the chains this node serves.
    pub chains: Vec<String>,
    /// Public relay endpoint of the node.
    #[serde(default)]
    pub service_url: String,
    /// Bonding state.
    #[serde(default)]
    pub status: StakeStatus,
    /// Whether the node is currently jailed.
    #[serde(default)]
    pub jailed: bool,
}

impl Validator {
    /// Build a staked, unjailed validator with its address derived from the
    /// public key.
    pub fn new(public_key: impl Into<String>, chains: Vec<String>, service_url: &str) -> Self {
        let public_key = public_key.into();
        let address = derive_address(&public_key);
        Self {
            address,
            public_key,
            chains,
            service_url: service_url.to_string(),
            status: StakeStatus::Staked,
            jailed: false,
        }
    }

    /// Whether the node is currently staked.
    pub fn is_staked(&self) -> bool {
        self.status == StakeStatus::Staked
    }

    /// Whether the node serves the given chain.
    pub fn serves_chain(&self, chain: &str) -> bool {
        self.chains.iter().any(|c| c == chain)
    }
}

/// An application as the relay core sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    /// Truncated public-key digest, lowercase hex.
    #[serde(default)]
    pub address: String,
    /// Ed25519 public key, lowercase hex.
    pub public_key: String,
    /// Chains the application is staked for.
    pub chains: Vec<String>,
    /// Relay allowance per session, across all staked chains.
    pub max_relays: i64,
    /// Bonding state.
    #[serde(default)]
    pub status: StakeStatus,
    /// Whether the application is currently jailed.
    #[serde(default)]
    pub jailed: bool,
}

impl Application {
    /// Build a staked, unjailed application with its address derived from
    /// the public key.
    pub fn new(public_key: impl Into<String>, chains: Vec<String>, max_relays: i64) -> Self {
        let public_key = public_key.into();
        let address = derive_address(&public_key);
        Self {
            address,
            public_key,
            chains,
            max_relays,
            status: StakeStatus::Staked,
            jailed: false,
        }
    }

    /// Whether the application is currently staked.
    pub fn is_staked(&self) -> bool {
        self.status == StakeStatus::Staked
    }
}

fn derive_address(public_key_hex: &str) -> String {
    match hex::decode(public_key_hex) {
        Ok(bytes) => crypto::address_of(&bytes),
        Err(_) => String::new(),
    }
}

/// Read-only view of the ledger consumed by the relay core.
///
/// Implementations must be cheap to call concurrently; the pipeline reads
/// from worker tasks without coordination.
pub trait StateAccessor: Send + Sync {
    /// Latest committed block height.
    fn current_block_height(&self) -> i64;

    /// Block hash at the given height.
    fn block_hash_at(&self, height: i64) -> Result<[u8; 32], CoreError>;

    /// Look up a staked application by its public key.
    fn app_by_public_key(&self, public_key: &str) -> Option<Application>;

    /// Snapshot of the staked validator set at the given height.
    fn staked_validators_at(&self, height: i64) -> Result<Vec<Validator>, CoreError>;

    /// Number of nodes per session.
    fn session_node_count(&self) -> usize;

    /// Accepted drift between client-reported and node block heights.
    fn client_block_allowance(&self) -> i64;

    /// Number of blocks in one session epoch.
    fn blocks_per_session(&self) -> i64;
}

/// Snapshot document consumed by [`StaticLedger`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Latest block height in the snapshot.
    pub height: i64,
    /// Session epoch length.
    #[serde(default = "default_blocks_per_session")]
    pub blocks_per_session: i64,
    /// Nodes per session.
    #[serde(default = "default_session_node_count")]
    pub session_node_count: usize,
    /// Height drift allowance for relay metadata.
    #[serde(default = "default_client_block_allowance")]
    pub client_block_allowance: i64,
    /// Staked validators.
    #[serde(default)]
    pub validators: Vec<Validator>,
    /// Staked applications.
    #[serde(default)]
    pub applications: Vec<Application>,
}

fn default_blocks_per_session() -> i64 {
    4
}

fn default_session_node_count() -> usize {
    5
}

fn default_client_block_allowance() -> i64 {
    1
}

impl Default for LedgerSnapshot {
    /// An empty ledger at height 0 with default parameters.
    fn default() -> Self {
        Self {
            height: 0,
            blocks_per_session: default_blocks_per_session(),
            session_node_count: default_session_node_count(),
            client_block_allowance: default_client_block_allowance(),
            validators: Vec::new(),
            applications: Vec::new(),
        }
    }
}

/// In-memory [`StateAccessor`] over a fixed snapshot.
///
/// Block hashes are derived deterministically from the height, so any two
/// nodes loading the same snapshot agree on every hash — which is what the
/// session deriver needs to stay consistent across nodes.
pub struct StaticLedger {
    height: i64,
    blocks_per_session: i64,
    session_node_count: usize,
    client_block_allowance: i64,
    validators: Vec<Validator>,
    applications: HashMap<String, Application>,
}

impl StaticLedger {
    /// Build a ledger from a snapshot, deriving any missing addresses.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let validators = snapshot
            .validators
            .into_iter()
            .map(|mut v| {
                if v.address.is_empty() {
                    v.address = derive_address(&v.public_key);
                }
                v
            })
            .collect();
        let applications = snapshot
            .applications
            .into_iter()
            .map(|mut a| {
                if a.address.is_empty() {
                    a.address = derive_address(&a.public_key);
                }
                (a.public_key.clone(), a)
            })
            .collect();
        Self {
            height: snapshot.height,
            blocks_per_session: snapshot.blocks_per_session.max(1),
            session_node_count: snapshot.session_node_count,
            client_block_allowance: snapshot.client_block_allowance,
            validators,
            applications,
        }
    }

    /// Load a snapshot document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CoreError::StateUnavailable(format!("snapshot unreadable: {e}")))?;
        let snapshot: LedgerSnapshot = serde_json::from_str(&raw)
            .map_err(|e| CoreError::StateUnavailable(format!("snapshot malformed: {e}")))?;
        Ok(Self::from_snapshot(snapshot))
    }
}

impl StateAccessor for StaticLedger {
    fn current_block_height(&self) -> i64 {
        self.height
    }

    fn block_hash_at(&self, height: i64) -> Result<[u8; 32], CoreError> {
        if height < 1 || height > self.height {
            return Err(CoreError::StateUnavailable(format!(
                "no block at height {height}"
            )));
        }
        Ok(crypto::hash(format!("block:{height}").as_bytes()))
    }

    fn app_by_public_key(&self, public_key: &str) -> Option<Application> {
        self.applications.get(public_key).cloned()
    }

    fn staked_validators_at(&self, height: i64) -> Result<Vec<Validator>, CoreError> {
        if height < 1 || height > self.height {
            return Err(CoreError::StateUnavailable(format!(
                "no validator set at height {height}"
            )));
        }
        Ok(self
            .validators
            .iter()
            .filter(|v| v.is_staked())
            .cloned()
            .collect())
    }

    fn session_node_count(&self) -> usize {
        self.session_node_count
    }

    fn client_block_allowance(&self) -> i64 {
        self.client_block_allowance
    }

    fn blocks_per_session(&self) -> i64 {
        self.blocks_per_session
    }
}
