//! JSON-RPC gateway to the node.
//!
//! The browser is untrusted. A call is forwarded only when credentials are
//! configured, the body is a well-formed request, the method is allow-listed
//! and its parameters have the right shape. The node's credentials are added
//! here and never leave the server.

use std::time::Duration;

use reqwest::Client;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::RpcCredentials;
use crate::error::{Error, Result, Upstream};
use crate::utils::body::{read_limited_body, transport_error};
use crate::utils::constants::{JSONRPC_VERSION, RPC_REQUEST_ID};
use crate::utils::validation::{is_method_allowed, validate_rpc_params};

// ═══════════════════════════════════════════════════════════════════════════════
// REQUEST TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Call as sent by the browser
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcRequest {
    /// Method name
    pub method: String,
    /// Positional parameters; `[]` when omitted
    #[serde(default = "empty_params")]
    pub params: Value,
    /// Caller's id, not forwarded
    #[serde(default)]
    pub id: Option<Value>,
}

fn empty_params() -> Value {
    Value::Array(Vec::new())
}

impl RpcRequest {
    /// Parse a request body
    pub fn parse(body: &[u8]) -> Result<Self> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| Error::InvalidRequest(e.to_string()))?;
        if !value.is_object() {
            return Err(Error::InvalidRequest("body is not an object".into()));
        }

        serde_json::from_value(value).map_err(|e| Error::InvalidRequest(e.to_string()))
    }
}

/// Envelope sent to the node
#[derive(Debug, Serialize)]
pub struct RpcEnvelope<'a> {
    /// Always "1.0"
    pub jsonrpc: &'static str,
    /// Fixed gateway id
    pub id: &'static str,
    /// Method name
    pub method: &'a str,
    /// Positional parameters
    pub params: &'a Value,
}

impl<'a> RpcEnvelope<'a> {
    /// Wrap a validated request
    pub fn new(request: &'a RpcRequest) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: RPC_REQUEST_ID,
            method: &request.method,
            params: &request.params,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GATEWAY
// ═══════════════════════════════════════════════════════════════════════════════

/// Validating proxy in front of the node's RPC port
pub struct RpcGateway {
    client: Client,
    credentials: Option<RpcCredentials>,
    max_response_bytes: usize,
}

impl RpcGateway {
    /// Create a gateway; `credentials: None` answers every call with 503
    pub fn new(
        credentials: Option<RpcCredentials>,
        timeout: Duration,
        max_response_bytes: usize,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create RPC client: {}", e)))?;

        Ok(Self {
            client,
            credentials,
            max_response_bytes,
        })
    }

    /// True if node credentials are present
    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Validate a raw request body and forward it.
    ///
    /// Checks run in order: credentials, body shape, method allow-list,
    /// parameter shape. Nothing is sent to the node unless all pass. The
    /// node's reply is returned byte for byte once it is known to be JSON.
    pub async fn handle(&self, body: &[u8]) -> Result<Vec<u8>> {
        let credentials = self.credentials.as_ref().ok_or(Error::NotConfigured)?;
        let request = RpcRequest::parse(body)?;
        Self::authorize(&request)?;
        self.forward(credentials, &request).await
    }

    /// Apply the method allow-list and parameter checks
    pub fn authorize(request: &RpcRequest) -> Result<()> {
        if !is_method_allowed(&request.method) {
            return Err(Error::MethodNotAllowed(request.method.clone()));
        }

        if !validate_rpc_params(&request.method, &request.params) {
            return Err(Error::InvalidParams {
                method: request.method.clone(),
            });
        }

        Ok(())
    }

    /// Send exactly one call to the node and relay its JSON reply
    async fn forward(
        &self,
        credentials: &RpcCredentials,
        request: &RpcRequest,
    ) -> Result<Vec<u8>> {
        tracing::debug!(method = %request.method, "forwarding rpc call");

        let response = self
            .client
            .post(credentials.endpoint())
            .basic_auth(&credentials.user, Some(&credentials.password))
            .json(&RpcEnvelope::new(request))
            .send()
            .await
            .map_err(|e| transport_error(&Upstream::Node, e))?;

        let status = response.status();
        let body = read_limited_body(response, self.max_response_bytes, &Upstream::Node).await?;

        if let Err(e) = serde_json::from_slice::<IgnoredAny>(&body) {
            tracing::error!(method = %request.method, %status, "node returned non-JSON body");
            return Err(Error::InvalidUpstreamResponse(e.to_string()));
        }

        Ok(body)
    }
}
