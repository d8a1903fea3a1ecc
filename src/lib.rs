// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relay Node - Decentralized Relay Servicing
//!
//! This crate implements the relay servicing pipeline of a service node:
//! application-owned clients submit signed relays, the node proxies them to
//! locally hosted blockchains, and every served relay is recorded as a
//! proof that settlement later turns into rewards.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `chains` - hosted blockchain registry
//! - `config` - immutable runtime configuration
//! - `crypto` - Ed25519, SHA-256, and hex adapters
//! - `error` - domain taxonomy and HTTP error mapping
//! - `evidence` - proof store pending settlement
//! - `ledger` - state accessor over the consensus layer
//! - `relay` - wire types, validation, execution, pipeline
//! - `session` - session derivation and caching
//! - `state` - shared application state

pub mod api;
pub mod chains;
pub mod config;
pub mod crypto;
pub mod error;
pub mod evidence;
pub mod ledger;
pub mod relay;
pub mod session;
pub mod state;
