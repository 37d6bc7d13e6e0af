//! # Site Gateway
//!
//! HTTP front end for a cryptocurrency project's public website. It serves
//! the static site, proxies two exchange ticker APIs as sanitized JSON and
//! relays a small allow-listed subset of node JSON-RPC calls for the web
//! wallet, holding the node's credentials server-side.
//!
//! ## Architecture
//!
//! - **Config**: Startup configuration from defaults, a JSON file and the environment
//! - **Exchange**: Ticker sources and the fetch, bound, parse, sanitize pipeline
//! - **RPC**: Rate limiting, origin allow-list and the validating node gateway
//! - **Server**: Shared state, routing and HTTP handlers
//! - **Utils**: Sanitization, parameter validation, bounded reads and constants
//!
//! ## Design Principles
//!
//! - **Untrusted input**: Browser calls and exchange payloads are validated before use
//! - **Bounded**: Every upstream read has a timeout and a size limit
//! - **Quiet failures**: Upstream detail is logged, never returned
//!
//! ## Example
//!
//! ```rust,ignore
//! use site_gateway::prelude::*;
//!
//! let config = GatewayConfig::from_env()?;
//! let state = Arc::new(AppState::new(config)?);
//! let app = build_router(state);
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod config;
pub mod error;
pub mod exchange;
pub mod rpc;
pub mod server;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{GatewayConfig, RpcCredentials};
    pub use crate::error::{Error, Result};
    pub use crate::exchange::{ExchangeProxy, ExchangeSource, TickerOutcome};
    pub use crate::rpc::{
        cors::CorsPolicy,
        gateway::RpcGateway,
        middleware::ClientIpResolver,
        rate_limiter::{Clock, RateLimitRule, RateLimiters, RateLimits, RouteClass},
    };
    pub use crate::server::{build_router, AppState};
    pub use crate::utils::sanitize::TickerRecord;
}

/// Gateway version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service name reported by the health check
pub const SERVICE_NAME: &str = "site-gateway";
