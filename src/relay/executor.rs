// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Upstream execution.
//!
//! Forwards a validated payload to the locally hosted blockchain endpoint
//! and normalizes the response. The executor never retries: the client owns
//! retry policy by issuing a fresh relay with new entropy. Every request
//! carries the configured deadline; expiry surfaces as [`CoreError::Timeout`]
//! and the caller records no proof.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};

use crate::chains::{BasicAuth, HostedBlockchain};
use crate::error::CoreError;

use super::types::Payload;

/// HTTP forwarder to hosted chains.
pub struct UpstreamExecutor {
    client: Client,
    sort_json_responses: bool,
}

impl UpstreamExecutor {
    /// Build an executor with the given upstream deadline.
    pub fn new(timeout: Duration, sort_json_responses: bool) -> Result<Self, CoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::HttpExecution(e.to_string()))?;
        Ok(Self {
            client,
            sort_json_responses,
        })
    }

    /// Execute a payload against a hosted chain entry.
    pub async fn execute(
        &self,
        payload: &Payload,
        chain: &HostedBlockchain,
    ) -> Result<String, CoreError> {
        self.send(
            join_url(&chain.url, &payload.path),
            payload,
            chain.basic_auth.as_ref(),
        )
        .await
    }

    /// Execute a payload against an explicit URL (the sim surface).
    pub async fn execute_at(&self, url: &str, payload: &Payload) -> Result<String, CoreError> {
        self.send(join_url(url, &payload.path), payload, None).await
    }

    async fn send(
        &self,
        url: String,
        payload: &Payload,
        auth: Option<&BasicAuth>,
    ) -> Result<String, CoreError> {
        let method = if payload.method.is_empty() {
            Method::POST
        } else {
            Method::from_bytes(payload.method.as_bytes()).map_err(|_| {
                CoreError::HttpExecution(format!("invalid HTTP method {:?}", payload.method))
            })?
        };

        let mut request = self.client.request(method, &url).body(payload.data.clone());
        match &payload.headers {
            Some(headers) if !headers.is_empty() => {
                for (name, value) in headers {
                    request = request.header(name, value);
                }
            }
            _ => request = request.header(CONTENT_TYPE, "application/json"),
        }
        if let Some(auth) = auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = request.send().await.map_err(classify_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await.map_err(classify_transport_error)?;
        if self.sort_json_responses {
            Ok(sort_json_response(&body))
        } else {
            Ok(body)
        }
    }
}

fn classify_transport_error(err: reqwest::Error) -> CoreError {
    if err.is_timeout() {
        CoreError::Timeout
    } else {
        CoreError::HttpExecution(err.to_string())
    }
}

/// Join a base URL and a request path: one slash between them, regardless of
/// how either side spells its edges.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Re-emit a JSON object response in canonical key-sorted form.
///
/// Non-objects and bodies that do not parse pass through untouched.
pub fn sort_json_response(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value @ serde_json::Value::Object(_)) => {
            serde_json::to_string(&value).unwrap_or_else(|_| body.to_string())
        }
        _ => body.to_string(),
    }
}
