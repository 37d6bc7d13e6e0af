//! Exchange ticker fetching.
//!
//! Every source goes through the same pipeline: fetch with a timeout, read a
//! bounded body, parse, locate the pair, sanitize. Upstream detail ends up in
//! logs, never in responses.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result, Upstream};
use crate::exchange::sources::ExchangeSource;
use crate::utils::body::{read_limited_body, transport_error};
use crate::utils::constants::USER_AGENT;
use crate::utils::sanitize::{sanitize_ticker, TickerRecord};

// ═══════════════════════════════════════════════════════════════════════════════
// OUTCOME
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of a successful round trip to an exchange
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TickerOutcome {
    /// Pair present and sanitized
    Found(TickerRecord),
    /// Document was valid but did not list the pair
    PairNotFound {
        /// `"<pair> not found"`
        error: String,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXCHANGE PROXY
// ═══════════════════════════════════════════════════════════════════════════════

/// HTTP client shared by all exchange sources
pub struct ExchangeProxy {
    client: Client,
    max_response_bytes: usize,
}

impl ExchangeProxy {
    /// Create a proxy with the given per-request timeout and body bound
    pub fn new(timeout: Duration, max_response_bytes: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_response_bytes,
        })
    }

    /// Fetch, bound, parse, extract and sanitize one source's ticker
    pub async fn fetch_ticker(&self, source: &ExchangeSource) -> Result<TickerOutcome> {
        let upstream = Upstream::Exchange(source.name.clone());
        let response = self
            .client
            .get(&source.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| transport_error(&upstream, e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(exchange = %source.name, %status, "exchange returned error status");
        }

        let body = read_limited_body(response, self.max_response_bytes, &upstream).await?;
        let document: Value =
            serde_json::from_slice(&body).map_err(|e| Error::MalformedUpstreamBody {
                upstream: source.name.clone(),
                reason: e.to_string(),
            })?;

        Self::select_ticker(source, &document)
    }

    /// Locate and sanitize the configured pair in a parsed document
    pub fn select_ticker(source: &ExchangeSource, document: &Value) -> Result<TickerOutcome> {
        let outcome = source
            .extract(document)?
            .and_then(sanitize_ticker)
            .map(TickerOutcome::Found)
            .unwrap_or_else(|| TickerOutcome::PairNotFound {
                error: source.not_found_message(),
            });

        if let TickerOutcome::PairNotFound { .. } = outcome {
            tracing::info!(exchange = %source.name, pair = %source.pair, "pair not listed");
        }

        Ok(outcome)
    }
}
