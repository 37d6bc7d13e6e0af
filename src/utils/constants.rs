//! Gateway constants.
//!
//! Limits, defaults and fixed identifiers live here so they can be audited in
//! one place.

// ═══════════════════════════════════════════════════════════════════════════════
// RESPONSE BOUNDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum exchange ticker body (1 MB)
pub const EXCHANGE_MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// Maximum node RPC body (10 MB)
pub const RPC_MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

/// Maximum accepted request body from the browser (1 MB)
pub const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

// ═══════════════════════════════════════════════════════════════════════════════
// TIMEOUTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Exchange ticker request timeout
pub const EXCHANGE_TIMEOUT_SECS: u64 = 10;

/// Node RPC request timeout
pub const RPC_TIMEOUT_SECS: u64 = 30;

// ═══════════════════════════════════════════════════════════════════════════════
// RATE LIMIT BUDGETS
// ═══════════════════════════════════════════════════════════════════════════════

/// General budget: 200 requests per 15 minutes
pub const GENERAL_MAX_REQUESTS: u32 = 200;
/// General window
pub const GENERAL_WINDOW_SECS: u64 = 15 * 60;

/// Exchange ticker budget: 60 requests per minute
pub const API_MAX_REQUESTS: u32 = 60;
/// Exchange ticker window
pub const API_WINDOW_SECS: u64 = 60;

/// Download budget: 20 requests per 15 minutes
pub const DOWNLOADS_MAX_REQUESTS: u32 = 20;
/// Download window
pub const DOWNLOADS_WINDOW_SECS: u64 = 15 * 60;

/// RPC budget: 30 requests per minute
pub const RPC_MAX_REQUESTS: u32 = 30;
/// RPC window
pub const RPC_WINDOW_SECS: u64 = 60;

/// How often stale rate-limit windows are swept
pub const CLEANUP_INTERVAL_SECS: u64 = 60;

// ═══════════════════════════════════════════════════════════════════════════════
// NODE RPC
// ═══════════════════════════════════════════════════════════════════════════════

/// Default node RPC host
pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";

/// Default node RPC port
pub const DEFAULT_RPC_PORT: u16 = 8332;

/// JSON-RPC version sent to the node
pub const JSONRPC_VERSION: &str = "1.0";

/// Request id stamped on every forwarded call
pub const RPC_REQUEST_ID: &str = "web-wallet";

// ═══════════════════════════════════════════════════════════════════════════════
// EXCHANGES
// ═══════════════════════════════════════════════════════════════════════════════

/// KlingEx public tickers endpoint (array of tickers)
pub const KLINGEX_TICKERS_URL: &str = "https://api.klingex.io/api/tickers";

/// KlingEx trading pair identifier
pub const KLINGEX_PAIR: &str = "SCC_USDT";

/// RabidRabbit public ticker endpoint (mapping keyed by pair)
pub const RABIDRABBIT_TICKER_URL: &str = "https://rabid-rabbit.org/api/public/v1/ticker";

/// RabidRabbit trading pair identifier
pub const RABIDRABBIT_PAIR: &str = "SCC_USDT";

/// User agent for outbound exchange requests
pub const USER_AGENT: &str = concat!("site-gateway/", env!("CARGO_PKG_VERSION"));

// ═══════════════════════════════════════════════════════════════════════════════
// SERVER
// ═══════════════════════════════════════════════════════════════════════════════

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

/// Default static asset directory
pub const DEFAULT_STATIC_DIR: &str = "public";

/// Default reverse-proxy hops to trust for client IP resolution
pub const DEFAULT_TRUST_PROXY_HOPS: usize = 1;

/// Preflight cache lifetime in seconds
pub const CORS_MAX_AGE_SECS: u64 = 86_400;
