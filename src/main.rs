// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::sync::Arc;
use std::{env, process};

use tracing_subscriber::EnvFilter;

use relay_node::api::router;
use relay_node::config::{
    CoreConfig, DEFAULT_NODE_KEY_FILE, LEDGER_SNAPSHOT_ENV, NODE_KEY_FILE_ENV,
};
use relay_node::crypto::NodeKeys;
use relay_node::ledger::{LedgerSnapshot, StaticLedger};
use relay_node::state::AppState;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = match CoreConfig::load_from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "could not load configuration");
            process::exit(1);
        }
    };

    let key_file =
        env::var(NODE_KEY_FILE_ENV).unwrap_or_else(|_| DEFAULT_NODE_KEY_FILE.to_string());
    let keys = NodeKeys::load_or_generate(&key_file).unwrap_or_else(|err| {
        tracing::error!(error = %err, path = %key_file, "could not load node keys");
        process::exit(1);
    });
    tracing::info!(
        address = %keys.address(),
        public_key = %keys.public_key_hex(),
        "node identity loaded"
    );

    let ledger = match env::var(LEDGER_SNAPSHOT_ENV) {
        Ok(path) => StaticLedger::load(&path).unwrap_or_else(|err| {
            tracing::error!(error = %err, path = %path, "could not load ledger snapshot");
            process::exit(1);
        }),
        Err(_) => {
            tracing::warn!("no ledger snapshot configured - starting with an empty ledger");
            StaticLedger::from_snapshot(LedgerSnapshot::default())
        }
    };

    let port = config.rpc.port;
    let state = match AppState::new(config, Arc::new(ledger), keys) {
        Ok(state) => state,
        Err(err) => {
            tracing::error!(error = %err, "could not build node state");
            process::exit(1);
        }
    };
    tracing::info!(
        hosted_chains = state.chains.len(),
        session_cache = state.config.pocketcore.session_cache_capacity,
        max_concurrent_relays = state.config.pocketcore.max_concurrent_relays,
        "relay node configured"
    );

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    tracing::info!(%addr, "relay node listening");

    axum::serve(listener, router(state).into_make_service())
        .await
        .expect("Server failed");
}

/// Initialize tracing from `RUST_LOG` and `LOG_FORMAT`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env::var("LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
