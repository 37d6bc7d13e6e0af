//! Error types for the site gateway.
//!
//! Every failure a handler can produce is a variant of [`Error`]. Each variant
//! knows its HTTP status and a public message; the `Display` text may carry
//! upstream detail and is only ever logged.

use std::fmt;
use std::time::Duration;

use axum::{
    extract::rejection::BytesRejection,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Remote service a request was sent to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upstream {
    /// The node's RPC port
    Node,
    /// A ticker source, by name
    Exchange(String),
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Upstream::Node => f.write_str("rpc"),
            Upstream::Exchange(name) => f.write_str(name),
        }
    }
}

/// Main error type for the gateway
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Client Input Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Request body is not a JSON object with a string `method`
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Method is not on the allow-list
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Request body exceeded the accepted size
    #[error("Request body too large")]
    RequestTooLarge,

    /// Parameters failed shape validation for the method
    #[error("Invalid parameters for {method}")]
    InvalidParams {
        /// Method whose parameters were rejected
        method: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Configuration Errors
    // ═══════════════════════════════════════════════════════════════════

    /// RPC credentials were never configured
    #[error("RPC service not configured")]
    NotConfigured,

    /// Invalid startup configuration
    #[error("Configuration error: {0}")]
    Config(String),

    // ═══════════════════════════════════════════════════════════════════
    // Upstream Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Upstream did not answer within the timeout
    #[error("{upstream} timed out")]
    UpstreamTimeout {
        /// Upstream that did not answer
        upstream: Upstream,
    },

    /// Connection or transport failure
    #[error("{upstream} request failed: {reason}")]
    UpstreamRequest {
        /// Upstream that failed
        upstream: Upstream,
        /// Transport error detail
        reason: String,
    },

    /// Upstream body exceeded the size bound
    #[error("Response too large: limit {limit} bytes")]
    ResponseTooLarge {
        /// Byte limit that was exceeded
        limit: usize,
    },

    /// Node answered with something that is not JSON
    #[error("Invalid RPC response: {0}")]
    InvalidUpstreamResponse(String),

    /// Exchange body is not JSON
    #[error("Malformed body from {upstream}: {reason}")]
    MalformedUpstreamBody {
        /// Upstream name
        upstream: String,
        /// Parse error detail
        reason: String,
    },

    /// Exchange JSON has the wrong top-level shape
    #[error("Invalid response format from {0}")]
    InvalidResponseFormat(String),

    // ═══════════════════════════════════════════════════════════════════
    // Rate Limiting
    // ═══════════════════════════════════════════════════════════════════

    /// Client exhausted its window budget
    #[error("Rate limited: {message}")]
    RateLimited {
        /// Message returned to the client
        message: String,
        /// Time until the window resets
        retry_after: Duration,
    },
}

impl Error {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidRequest(_) | Error::InvalidParams { .. } => StatusCode::BAD_REQUEST,
            Error::MethodNotAllowed(_) => StatusCode::FORBIDDEN,
            Error::RequestTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Error::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            Error::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::UpstreamRequest { .. }
            | Error::ResponseTooLarge { .. }
            | Error::InvalidUpstreamResponse(_)
            | Error::MalformedUpstreamBody { .. }
            | Error::InvalidResponseFormat(_)
            | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the browser
    pub fn public_message(&self) -> String {
        match self {
            Error::InvalidRequest(_) => "Invalid request".into(),
            Error::MethodNotAllowed(_) => "Method not allowed".into(),
            Error::InvalidParams { .. } => "Invalid parameters".into(),
            Error::RequestTooLarge => "Request too large".into(),
            Error::NotConfigured => "RPC service not configured".into(),
            Error::ResponseTooLarge { .. } => "Response too large".into(),
            Error::InvalidUpstreamResponse(_) => "Invalid RPC response".into(),
            Error::MalformedUpstreamBody { .. } => "Failed to parse response".into(),
            Error::InvalidResponseFormat(_) => "Invalid response format".into(),
            Error::UpstreamTimeout { upstream: Upstream::Node } => "RPC request timed out".into(),
            Error::UpstreamTimeout { .. } => "Upstream request timed out".into(),
            Error::UpstreamRequest { upstream: Upstream::Node, .. } => "RPC request failed".into(),
            Error::UpstreamRequest { .. } => "Failed to fetch price data".into(),
            Error::RateLimited { message, .. } => message.clone(),
            Error::Config(_) => "Internal server error".into(),
        }
    }

    /// Returns true if the failure came from an upstream service
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::UpstreamTimeout { .. }
                | Error::UpstreamRequest { .. }
                | Error::ResponseTooLarge { .. }
                | Error::InvalidUpstreamResponse(_)
                | Error::MalformedUpstreamBody { .. }
                | Error::InvalidResponseFormat(_)
        )
    }

    /// Returns true if the caller sent something the gateway refuses
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidRequest(_)
                | Error::MethodNotAllowed(_)
                | Error::InvalidParams { .. }
                | Error::RequestTooLarge
        )
    }
}

impl From<BytesRejection> for Error {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::RequestTooLarge
        } else {
            Error::InvalidRequest(rejection.body_text())
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if self.is_upstream() {
            tracing::warn!(error = %self, "upstream failure");
        } else if self.is_client_error() {
            tracing::debug!(error = %self, "rejected request");
        }

        let status = self.status_code();
        let body = Json(json!({ "error": self.public_message() }));

        match &self {
            Error::RateLimited { retry_after, .. } => {
                let secs = retry_after.as_secs().max(1).to_string();
                (status, [(header::RETRY_AFTER, secs)], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}
