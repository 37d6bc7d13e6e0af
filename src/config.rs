//! Gateway configuration.
//!
//! Built once at startup from defaults, an optional JSON file and the
//! environment, then passed by value into [`crate::server::AppState`]. Nothing
//! reads configuration from globals after that.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::exchange::sources::ExchangeSources;
use crate::rpc::rate_limiter::{RateLimitRule, RateLimits};
use crate::utils::constants::*;

// ═══════════════════════════════════════════════════════════════════════════════
// RPC CREDENTIALS
// ═══════════════════════════════════════════════════════════════════════════════

/// Node RPC endpoint and credentials. Never serialized into responses.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcCredentials {
    /// RPC user
    pub user: String,
    /// RPC password
    pub password: String,
    /// Node host
    #[serde(default = "default_rpc_host")]
    pub host: String,
    /// Node RPC port
    #[serde(default = "default_rpc_port")]
    pub port: u16,
}

fn default_rpc_host() -> String {
    DEFAULT_RPC_HOST.to_string()
}

fn default_rpc_port() -> u16 {
    DEFAULT_RPC_PORT
}

impl RpcCredentials {
    /// Create credentials for the default local node
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            host: default_rpc_host(),
            port: default_rpc_port(),
        }
    }

    /// Point at a specific host and port
    pub fn with_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Plain HTTP URL of the node
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }
}

impl fmt::Debug for RpcCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GATEWAY CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listen address
    pub bind: SocketAddr,
    /// Static site root
    pub static_dir: PathBuf,
    /// Reverse proxies in front of this server whose forwarding headers are trusted
    pub trust_proxy_hops: usize,
    /// Origins allowed to call `/rpc` cross-origin
    pub allowed_origins: Vec<String>,
    /// Node credentials; `None` disables the RPC gateway
    pub rpc: Option<RpcCredentials>,
    /// Node request timeout in seconds
    pub rpc_timeout_secs: u64,
    /// Maximum node response size
    pub rpc_max_response_bytes: usize,
    /// Exchange request timeout in seconds
    pub exchange_timeout_secs: u64,
    /// Maximum exchange response size
    pub exchange_max_response_bytes: usize,
    /// Maximum accepted request body
    pub max_request_body_bytes: usize,
    /// Rate limit budgets
    pub limits: RateLimits,
    /// Interval between rate-limit sweeps
    pub cleanup_interval_secs: u64,
    /// Exchange ticker sources
    pub exchanges: ExchangeSources,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            trust_proxy_hops: DEFAULT_TRUST_PROXY_HOPS,
            allowed_origins: Vec::new(),
            rpc: None,
            rpc_timeout_secs: RPC_TIMEOUT_SECS,
            rpc_max_response_bytes: RPC_MAX_RESPONSE_BYTES,
            exchange_timeout_secs: EXCHANGE_TIMEOUT_SECS,
            exchange_max_response_bytes: EXCHANGE_MAX_RESPONSE_BYTES,
            max_request_body_bytes: MAX_REQUEST_BODY_BYTES,
            limits: RateLimits::default(),
            cleanup_interval_secs: CLEANUP_INTERVAL_SECS,
            exchanges: ExchangeSources::default(),
        }
    }
}

impl GatewayConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Credentials are set only when both `RPC_USER` and `RPC_PASSWORD` are
    /// non-empty; otherwise the RPC gateway stays disabled.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(bind) = var("BIND_ADDR") {
            self.bind = bind
                .parse()
                .map_err(|_| Error::Config(format!("invalid BIND_ADDR: {bind}")))?;
        }

        if let Some(dir) = var("STATIC_DIR") {
            self.static_dir = PathBuf::from(dir);
        }

        if let Some(hops) = var("TRUST_PROXY_HOPS") {
            self.trust_proxy_hops = hops
                .parse()
                .map_err(|_| Error::Config(format!("invalid TRUST_PROXY_HOPS: {hops}")))?;
        }

        if let Some(origins) = var("ALLOWED_ORIGINS") {
            self.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let (Some(user), Some(password)) = (var("RPC_USER"), var("RPC_PASSWORD")) {
            let mut credentials = match self.rpc.take() {
                Some(existing) => RpcCredentials { user, password, ..existing },
                None => RpcCredentials::new(user, password),
            };

            if let Some(host) = var("RPC_HOST") {
                credentials.host = host;
            }
            if let Some(port) = var("RPC_PORT") {
                credentials.port = port
                    .parse()
                    .map_err(|_| Error::Config(format!("invalid RPC_PORT: {port}")))?;
            }

            self.rpc = Some(credentials);
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.rpc_timeout_secs == 0 || self.exchange_timeout_secs == 0 {
            return Err(Error::Config("timeouts must be greater than 0".into()));
        }

        if self.rpc_max_response_bytes == 0
            || self.exchange_max_response_bytes == 0
            || self.max_request_body_bytes == 0
        {
            return Err(Error::Config("size limits must be greater than 0".into()));
        }

        let rules = [
            ("general", self.limits.general),
            ("api", self.limits.api),
            ("downloads", self.limits.downloads),
            ("rpc", self.limits.rpc),
        ];
        for (name, rule) in rules {
            validate_rule(name, rule)?;
        }

        for source in self.exchanges.iter() {
            if source.url.is_empty() || source.pair.is_empty() {
                return Err(Error::Config(format!(
                    "exchange {} needs a url and a pair",
                    source.name
                )));
            }
        }

        if let Some(rpc) = &self.rpc {
            if rpc.host.is_empty() || rpc.port == 0 {
                return Err(Error::Config("RPC host and port must be set".into()));
            }
        }

        Ok(())
    }

    /// Node request timeout
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    /// Exchange request timeout
    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_secs(self.exchange_timeout_secs)
    }
}

fn validate_rule(name: &str, rule: RateLimitRule) -> Result<()> {
    if rule.max_requests == 0 || rule.window_secs == 0 {
        return Err(Error::Config(format!(
            "rate limit {name} needs a non-zero budget and window"
        )));
    }
    Ok(())
}
