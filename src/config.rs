// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! One JSON configuration document is read at startup and frozen into a
//! [`CoreConfig`] value handed to every component at construction. There is
//! no process-global mutable configuration state.
//!
//! ## Recognized keys
//!
//! | Key | Description | Default |
//! |-----|-------------|---------|
//! | `rpc.port` | Server bind port | `8081` |
//! | `rpc.timeout_ms` | Upstream relay deadline in milliseconds | `30000` |
//! | `pocketcore.session_cache_capacity` | Bounded LRU size for derived sessions | `500` |
//! | `pocketcore.client_block_allowance` | Accepted drift between client and node heights | `1` |
//! | `pocketcore.sort_json_responses` | Canonicalize JSON object responses | `false` |
//! | `pocketcore.hosted_chains` | `[{id, url, basic_auth?}]` upstream endpoints | `[]` |
//! | `pocketcore.max_concurrent_relays` | In-flight relay bound | `128` |
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `RELAY_CONFIG` | Path to the configuration document | `config.json` |
//! | `NODE_KEY_FILE` | Path to the node's Ed25519 seed file | `node_key` |
//! | `LEDGER_SNAPSHOT` | Path to the ledger snapshot document | unset |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |
//! | `CORS_ALLOWED_ORIGINS` | Comma-separated allowed origins | permissive |

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chains::HostedBlockchain;

/// Environment variable naming the configuration document path.
pub const CONFIG_PATH_ENV: &str = "RELAY_CONFIG";

/// Environment variable naming the node's Ed25519 seed file.
pub const NODE_KEY_FILE_ENV: &str = "NODE_KEY_FILE";

/// Environment variable naming the ledger snapshot document.
pub const LEDGER_SNAPSHOT_ENV: &str = "LEDGER_SNAPSHOT";

/// Default configuration document path.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Default node key file path.
pub const DEFAULT_NODE_KEY_FILE: &str = "node_key";

/// Errors raised while loading the configuration document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read configuration at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("could not parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The complete, immutable node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CoreConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub rpc: RpcConfig,
    /// Relay servicing settings.
    #[serde(default)]
    pub pocketcore: PocketCoreConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcConfig {
    /// Port the RPC server binds to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Deadline for upstream relay execution, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u32,
}

/// Relay servicing settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PocketCoreConfig {
    /// Capacity of the derived-session LRU cache.
    #[serde(default = "default_session_cache_capacity")]
    pub session_cache_capacity: usize,
    /// Accepted drift between the client's and the node's block heights.
    #[serde(default = "default_client_block_allowance")]
    pub client_block_allowance: i64,
    /// Re-emit JSON object responses in canonical key-sorted form.
    #[serde(default)]
    pub sort_json_responses: bool,
    /// Upstream chains this node hosts.
    #[serde(default)]
    pub hosted_chains: Vec<HostedBlockchain>,
    /// Bound on concurrently executing relays.
    #[serde(default = "default_max_concurrent_relays")]
    pub max_concurrent_relays: usize,
}

fn default_port() -> u16 {
    8081
}

fn default_timeout_ms() -> u32 {
    30_000
}

fn default_session_cache_capacity() -> usize {
    500
}

fn default_client_block_allowance() -> i64 {
    1
}

fn default_max_concurrent_relays() -> usize {
    128
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for PocketCoreConfig {
    fn default() -> Self {
        Self {
            session_cache_capacity: default_session_cache_capacity(),
            client_block_allowance: default_client_block_allowance(),
            sort_json_responses: false,
            hosted_chains: Vec::new(),
            max_concurrent_relays: default_max_concurrent_relays(),
        }
    }
}

impl CoreConfig {
    /// Load the configuration from a JSON document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load the configuration from the path named by `RELAY_CONFIG`.
    ///
    /// Falls back to built-in defaults when neither the variable nor the
    /// default document exists.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        if Path::new(&path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// The upstream execution deadline as a [`Duration`].
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.rpc.timeout_ms))
    }
}
