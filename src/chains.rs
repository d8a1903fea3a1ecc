// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Hosted Blockchains Registry
//!
//! Maps a local chain identifier (lowercase hex, e.g. `"0001"`) to the
//! upstream endpoint this node proxies it to. The registry is built once at
//! startup from the configuration document and is immutable afterwards, so
//! it is shared without locking.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Longest accepted network identifier, in hex characters.
const MAX_NETWORK_ID_LEN: usize = 16;

/// Optional credentials attached to every request to a hosted chain.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One locally hosted upstream blockchain endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostedBlockchain {
    /// Network identifier: lowercase hex string.
    pub id: String,
    /// Upstream endpoint base URL.
    pub url: String,
    /// Credentials for the upstream endpoint, if it requires them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,
}

/// Registry of all chains this node serves.
///
/// Stable for the node's lifetime; reloaded only at startup.
#[derive(Debug, Clone, Default)]
pub struct HostedBlockchains {
    chains: HashMap<String, HostedBlockchain>,
}

/// Check the shape of a network identifier: non-empty, even-length lowercase
/// hex, bounded size.
pub fn validate_network_identifier(id: &str) -> Result<(), CoreError> {
    if id.is_empty() || id.len() > MAX_NETWORK_ID_LEN || id.len() % 2 != 0 {
        return Err(CoreError::UnsupportedBlockchain(id.to_string()));
    }
    if hex::decode(id).is_err() || id.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(CoreError::UnsupportedBlockchain(id.to_string()));
    }
    Ok(())
}

impl HostedBlockchains {
    /// Build the registry from configuration entries.
    ///
    /// Rejects malformed identifiers and duplicate entries so a bad config
    /// fails at startup rather than at relay time.
    pub fn from_entries(entries: Vec<HostedBlockchain>) -> Result<Self, CoreError> {
        let mut chains = HashMap::with_capacity(entries.len());
        for entry in entries {
            validate_network_identifier(&entry.id)?;
            if chains.insert(entry.id.clone(), entry).is_some() {
                return Err(CoreError::StateUnavailable(
                    "duplicate hosted chain identifier in configuration".to_string(),
                ));
            }
        }
        Ok(Self { chains })
    }

    /// Whether the given chain is served by this node.
    pub fn contains(&self, id: &str) -> bool {
        self.chains.contains_key(id)
    }

    /// Look up a hosted chain entry.
    pub fn get(&self, id: &str) -> Result<&HostedBlockchain, CoreError> {
        self.chains
            .get(id)
            .ok_or_else(|| CoreError::UnsupportedBlockchain(id.to_string()))
    }

    /// Number of hosted chains.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> HostedBlockchain {
        HostedBlockchain {
            id: id.to_string(),
            url: format!("http://localhost:8545/{id}"),
            basic_auth: None,
        }
    }

    #[test]
    fn registry_contains_and_gets() {
        let hb = HostedBlockchains::from_entries(vec![entry("0001"), entry("0021")]).unwrap();
        assert_eq!(hb.len(), 2);
        assert!(hb.contains("0001"));
        assert!(!hb.contains("0002"));
        assert_eq!(hb.get("0021").unwrap().id, "0021");
        assert!(matches!(
            hb.get("0002"),
            Err(CoreError::UnsupportedBlockchain(_))
        ));
    }

    #[test]
    fn identifiers_must_be_even_hex() {
        assert!(validate_network_identifier("0001").is_ok());
        assert!(validate_network_identifier("").is_err());
        assert!(validate_network_identifier("001").is_err());
        assert!(validate_network_identifier("00zz").is_err());
        assert!(validate_network_identifier("00FF").is_err());
        assert!(validate_network_identifier("00010001000100010001").is_err());
    }

    #[test]
    fn duplicate_entries_are_rejected() {
        let result = HostedBlockchains::from_entries(vec![entry("0001"), entry("0001")]);
        assert!(result.is_err());
    }

    #[test]
    fn basic_auth_debug_redacts_password() {
        let auth = BasicAuth {
            username: "svc".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{auth:?}");
        assert!(rendered.contains("svc"));
        assert!(!rendered.contains("hunter2"));
    }
}
