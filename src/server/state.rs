//! Shared application state.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::error::Result;
use crate::exchange::fetchers::ExchangeProxy;
use crate::rpc::cors::CorsPolicy;
use crate::rpc::gateway::RpcGateway;
use crate::rpc::middleware::ClientIpResolver;
use crate::rpc::rate_limiter::{Clock, RateLimiters, SystemClock};

// ═══════════════════════════════════════════════════════════════════════════════
// SERVER STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Services shared by all handlers. Rate-limit windows are the only mutable part.
pub struct AppState {
    /// Validated configuration
    pub config: GatewayConfig,
    /// One limiter per route class
    pub limiters: RateLimiters,
    /// Node RPC gateway
    pub gateway: RpcGateway,
    /// Exchange ticker client
    pub exchange: ExchangeProxy,
    /// Origins allowed to call `/rpc`
    pub cors: CorsPolicy,
    /// Client IP resolution for rate limiting
    pub resolver: ClientIpResolver,
}

impl AppState {
    /// Build state on the system clock
    pub fn new(config: GatewayConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build state with an explicit clock for the rate limiters
    pub fn with_clock(config: GatewayConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let limiters = RateLimiters::new(&config.limits, clock);
        let gateway = RpcGateway::new(
            config.rpc.clone(),
            config.rpc_timeout(),
            config.rpc_max_response_bytes,
        )?;
        let exchange =
            ExchangeProxy::new(config.exchange_timeout(), config.exchange_max_response_bytes)?;
        let cors = CorsPolicy::new(&config.allowed_origins);
        let resolver = ClientIpResolver::new(config.trust_proxy_hops);

        Ok(Self {
            config,
            limiters,
            gateway,
            exchange,
            cors,
            resolver,
        })
    }

    /// True if node credentials are configured
    pub fn rpc_configured(&self) -> bool {
        self.gateway.is_configured()
    }
}
