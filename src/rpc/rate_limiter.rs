//! Fixed-window rate limiting.
//!
//! Each route class gets its own [`RateLimiter`] with a request budget per
//! window, tracked per client IP.
//!
//! # Features
//!
//! - Fixed windows created lazily on a client's first request
//! - Separate budgets for general, API, download and RPC traffic
//! - Injectable clock for deterministic tests
//! - Periodic cleanup of expired windows

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::utils::constants::*;

// ═══════════════════════════════════════════════════════════════════════════════
// ROUTE CLASSES
// ═══════════════════════════════════════════════════════════════════════════════

/// Traffic class with its own budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteClass {
    /// Every request
    General,
    /// Exchange ticker endpoints
    Api,
    /// Files under `/downloads`
    Downloads,
    /// Node RPC proxy
    Rpc,
}

impl RouteClass {
    /// Name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            RouteClass::General => "general",
            RouteClass::Api => "api",
            RouteClass::Downloads => "downloads",
            RouteClass::Rpc => "rpc",
        }
    }

    /// Message returned to a client that exhausted its budget
    pub fn denial_message(&self) -> &'static str {
        match self {
            RouteClass::General => "Too many requests, please try again later.",
            RouteClass::Api => "Too many API requests, please try again later.",
            RouteClass::Downloads => "Too many download requests, please try again later.",
            RouteClass::Rpc => "Too many RPC requests, please slow down.",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Budget for one route class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    /// Requests allowed per window
    pub max_requests: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

impl RateLimitRule {
    /// Create a new rule
    pub const fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
        }
    }

    /// Window length
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Budgets for all route classes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimits {
    /// Applied to every route
    pub general: RateLimitRule,
    /// Exchange tickers
    pub api: RateLimitRule,
    /// Downloads
    pub downloads: RateLimitRule,
    /// RPC proxy
    pub rpc: RateLimitRule,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            general: RateLimitRule::new(GENERAL_MAX_REQUESTS, GENERAL_WINDOW_SECS),
            api: RateLimitRule::new(API_MAX_REQUESTS, API_WINDOW_SECS),
            downloads: RateLimitRule::new(DOWNLOADS_MAX_REQUESTS, DOWNLOADS_WINDOW_SECS),
            rpc: RateLimitRule::new(RPC_MAX_REQUESTS, RPC_WINDOW_SECS),
        }
    }
}

impl RateLimits {
    /// Rule for a route class
    pub fn rule(&self, class: RouteClass) -> RateLimitRule {
        match class {
            RouteClass::General => self.general,
            RouteClass::Api => self.api,
            RouteClass::Downloads => self.downloads,
            RouteClass::Rpc => self.rpc,
        }
    }

    /// Relaxed budgets for local development
    pub fn development() -> Self {
        Self {
            general: RateLimitRule::new(100_000, GENERAL_WINDOW_SECS),
            api: RateLimitRule::new(10_000, API_WINDOW_SECS),
            downloads: RateLimitRule::new(10_000, DOWNLOADS_WINDOW_SECS),
            rpc: RateLimitRule::new(10_000, RPC_WINDOW_SECS),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLOCK
// ═══════════════════════════════════════════════════════════════════════════════

/// Time source for window arithmetic
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    /// Start at the current instant
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RATE LIMIT WINDOW
// ═══════════════════════════════════════════════════════════════════════════════

/// Request counter for one client in the current window
#[derive(Debug, Clone, Copy)]
struct RateLimitWindow {
    window_start: Instant,
    request_count: u32,
}

impl RateLimitWindow {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            request_count: 0,
        }
    }

    fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.duration_since(self.window_start) >= window
    }

    fn reset_after(&self, now: Instant, window: Duration) -> Duration {
        (self.window_start + window).saturating_duration_since(now)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RATE LIMITER
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of rate limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request allowed
    Allowed {
        /// Budget per window
        limit: u32,
        /// Requests left in this window
        remaining: u32,
        /// Time until the window resets
        reset_after: Duration,
    },
    /// Request rate limited
    RateLimited {
        /// Budget per window
        limit: u32,
        /// Time to wait before retry
        retry_after: Duration,
    },
}

impl RateLimitResult {
    /// Check if request is allowed
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Fixed-window limiter for one route class
pub struct RateLimiter {
    class: RouteClass,
    rule: RateLimitRule,
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<IpAddr, RateLimitWindow>>,
    stats: RateLimiterStats,
}

impl RateLimiter {
    /// Create new rate limiter on the system clock
    pub fn new(class: RouteClass, rule: RateLimitRule) -> Self {
        Self::with_clock(class, rule, Arc::new(SystemClock))
    }

    /// Create with an explicit clock
    pub fn with_clock(class: RouteClass, rule: RateLimitRule, clock: Arc<dyn Clock>) -> Self {
        Self {
            class,
            rule,
            clock,
            windows: Mutex::new(HashMap::new()),
            stats: RateLimiterStats::new(),
        }
    }

    /// Route class this limiter guards
    pub fn class(&self) -> RouteClass {
        self.class
    }

    /// Budget this limiter enforces
    pub fn rule(&self) -> RateLimitRule {
        self.rule
    }

    fn windows(&self) -> MutexGuard<'_, HashMap<IpAddr, RateLimitWindow>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count a request from `ip` and decide whether it may proceed
    pub fn check(&self, ip: IpAddr) -> RateLimitResult {
        let now = self.clock.now();
        let window = self.rule.window();

        let mut windows = self.windows();
        let entry = windows.entry(ip).or_insert_with(|| RateLimitWindow::new(now));

        if entry.is_expired(now, window) {
            *entry = RateLimitWindow::new(now);
        }

        entry.request_count = entry.request_count.saturating_add(1);
        let reset_after = entry.reset_after(now, window);

        if entry.request_count <= self.rule.max_requests {
            self.stats.record_allowed();
            RateLimitResult::Allowed {
                limit: self.rule.max_requests,
                remaining: self.rule.max_requests - entry.request_count,
                reset_after,
            }
        } else {
            self.stats.record_rate_limited();
            RateLimitResult::RateLimited {
                limit: self.rule.max_requests,
                retry_after: reset_after,
            }
        }
    }

    /// Drop windows that have fully elapsed
    pub fn cleanup(&self) {
        let now = self.clock.now();
        let window = self.rule.window();

        self.windows()
            .retain(|_, entry| !entry.is_expired(now, window));

        self.stats.record_cleanup();
    }

    /// Get statistics
    pub fn statistics(&self) -> RateLimiterStatistics {
        RateLimiterStatistics {
            class: self.class,
            total_requests: self.stats.total_requests.load(Ordering::Relaxed),
            allowed_requests: self.stats.allowed_requests.load(Ordering::Relaxed),
            rate_limited_requests: self.stats.rate_limited.load(Ordering::Relaxed),
            active_clients: self.windows().len(),
            cleanups: self.stats.cleanups.load(Ordering::Relaxed),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATISTICS
// ═══════════════════════════════════════════════════════════════════════════════

struct RateLimiterStats {
    total_requests: AtomicU64,
    allowed_requests: AtomicU64,
    rate_limited: AtomicU64,
    cleanups: AtomicU64,
}

impl RateLimiterStats {
    fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            allowed_requests: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
            cleanups: AtomicU64::new(0),
        }
    }

    fn record_allowed(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.allowed_requests.fetch_add(1, Ordering::Relaxed);
    }

    fn record_rate_limited(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    fn record_cleanup(&self) {
        self.cleanups.fetch_add(1, Ordering::Relaxed);
    }
}

/// Exported statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimiterStatistics {
    /// Route class
    pub class: RouteClass,
    /// Total requests processed
    pub total_requests: u64,
    /// Requests allowed
    pub allowed_requests: u64,
    /// Requests rate limited
    pub rate_limited_requests: u64,
    /// Clients with a live window
    pub active_clients: usize,
    /// Number of cleanups performed
    pub cleanups: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIMITER SET
// ═══════════════════════════════════════════════════════════════════════════════

/// One limiter per route class, sharing a clock
#[derive(Clone)]
pub struct RateLimiters {
    /// Every request
    pub general: Arc<RateLimiter>,
    /// Exchange tickers
    pub api: Arc<RateLimiter>,
    /// Downloads
    pub downloads: Arc<RateLimiter>,
    /// RPC proxy
    pub rpc: Arc<RateLimiter>,
}

impl RateLimiters {
    /// Build limiters from budgets on the given clock
    pub fn new(limits: &RateLimits, clock: Arc<dyn Clock>) -> Self {
        let build = |class| {
            Arc::new(RateLimiter::with_clock(class, limits.rule(class), clock.clone()))
        };

        Self {
            general: build(RouteClass::General),
            api: build(RouteClass::Api),
            downloads: build(RouteClass::Downloads),
            rpc: build(RouteClass::Rpc),
        }
    }

    /// All limiters
    pub fn all(&self) -> [&Arc<RateLimiter>; 4] {
        [&self.general, &self.api, &self.downloads, &self.rpc]
    }

    /// Sweep expired windows in every limiter
    pub fn cleanup(&self) {
        for limiter in self.all() {
            limiter.cleanup();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn limiter(max: u32, window_secs: u64) -> (RateLimiter, ManualClock) {
        let clock = ManualClock::new();
        let limiter = RateLimiter::with_clock(
            RouteClass::Rpc,
            RateLimitRule::new(max, window_secs),
            Arc::new(clock.clone()),
        );
        (limiter, clock)
    }

    #[test]
    fn test_default_budgets() {
        let limits = RateLimits::default();
        assert_eq!(limits.general, RateLimitRule::new(200, 900));
        assert_eq!(limits.api, RateLimitRule::new(60, 60));
        assert_eq!(limits.downloads, RateLimitRule::new(20, 900));
        assert_eq!(limits.rpc, RateLimitRule::new(30, 60));
    }

    #[test]
    fn test_rate_limiter_limit() {
        let (limiter, _clock) = limiter(3, 60);
        let ip = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1));

        for expected_remaining in [2, 1, 0] {
            match limiter.check(ip) {
                RateLimitResult::Allowed { remaining, limit, .. } => {
                    assert_eq!(limit, 3);
                    assert_eq!(remaining, expected_remaining);
                }
                other => panic!("expected allow, got {other:?}"),
            }
        }

        let result = limiter.check(ip);
        assert!(matches!(result, RateLimitResult::RateLimited { .. }));
    }

    #[test]
    fn test_window_resets() {
        let (limiter, clock) = limiter(1, 60);
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

        assert!(limiter.check(ip).is_allowed());
        clock.advance(Duration::from_secs(30));

        match limiter.check(ip) {
            RateLimitResult::RateLimited { retry_after, .. } => {
                assert_eq!(retry_after, Duration::from_secs(30));
            }
            other => panic!("expected deny, got {other:?}"),
        }

        clock.advance(Duration::from_secs(30));
        assert!(limiter.check(ip).is_allowed());
    }

    #[test]
    fn test_clients_are_independent() {
        let (limiter, _clock) = limiter(1, 60);
        let a = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let b = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

        assert!(limiter.check(a).is_allowed());
        assert!(!limiter.check(a).is_allowed());
        assert!(limiter.check(b).is_allowed());
    }

    #[test]
    fn test_cleanup_drops_expired_windows() {
        let (limiter, clock) = limiter(5, 60);
        limiter.check(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)));
        clock.advance(Duration::from_secs(45));
        limiter.check(IpAddr::V4(Ipv4Addr::new(2, 2, 2, 2)));
        assert_eq!(limiter.statistics().active_clients, 2);

        clock.advance(Duration::from_secs(20));
        limiter.cleanup();

        let stats = limiter.statistics();
        assert_eq!(stats.active_clients, 1);
        assert_eq!(stats.cleanups, 1);
    }

    #[test]
    fn test_statistics() {
        let (limiter, _clock) = limiter(1, 60);
        let ip = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));

        limiter.check(ip);
        limiter.check(ip);

        let stats = limiter.statistics();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.allowed_requests, 1);
        assert_eq!(stats.rate_limited_requests, 1);
    }

    #[test]
    fn test_limiter_set_uses_class_rules() {
        let limiters = RateLimiters::new(&RateLimits::default(), Arc::new(SystemClock));
        assert_eq!(limiters.rpc.class(), RouteClass::Rpc);
        assert_eq!(limiters.rpc.rule().max_requests, 30);
        assert_eq!(limiters.downloads.rule().max_requests, 20);
    }
}
