//! Axum middleware for rate limiting and response hardening.
//!
//! Provides tower layers that put a [`RateLimiter`] in front of a route and
//! stamp the fixed security header policy onto every response.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request, Response},
    response::IntoResponse,
};
use futures::future::BoxFuture;
use tower::{Layer, Service};

use super::rate_limiter::{RateLimitResult, RateLimiter, RateLimiters};
use crate::error::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// CLIENT IP RESOLUTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolves the client address behind a known number of reverse proxies.
///
/// Forwarded headers are only honored up to `trusted_hops` entries from the
/// right, so a client cannot pick its own rate-limit identity by sending a
/// forged `X-Forwarded-For`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIpResolver {
    trusted_hops: usize,
}

impl ClientIpResolver {
    /// Trust `trusted_hops` proxies in front of this server
    pub fn new(trusted_hops: usize) -> Self {
        Self { trusted_hops }
    }

    /// Resolve the client IP of a request
    pub fn resolve<B>(&self, req: &Request<B>) -> IpAddr {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

        self.resolve_from(peer, req.headers())
    }

    /// Resolve from a socket peer and request headers
    pub fn resolve_from(&self, peer: IpAddr, headers: &HeaderMap) -> IpAddr {
        if self.trusted_hops == 0 {
            return peer;
        }

        let chain: Vec<&str> = headers
            .get_all("x-forwarded-for")
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .collect();

        // The peer is the first trusted hop; each further hop appended one entry.
        let index = chain.len().saturating_sub(self.trusted_hops);

        chain
            .get(index)
            .and_then(|entry| entry.parse::<IpAddr>().ok())
            .unwrap_or(peer)
    }
}

impl Default for ClientIpResolver {
    fn default() -> Self {
        Self::new(crate::utils::constants::DEFAULT_TRUST_PROXY_HOPS)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RATE LIMIT LAYER
// ═══════════════════════════════════════════════════════════════════════════════

/// Tower layer for rate limiting
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter>,
    resolver: ClientIpResolver,
}

impl RateLimitLayer {
    /// Create new rate limit layer
    pub fn new(limiter: Arc<RateLimiter>, resolver: ClientIpResolver) -> Self {
        Self { limiter, resolver }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitMiddleware {
            inner,
            limiter: self.limiter.clone(),
            resolver: self.resolver,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RATE LIMIT MIDDLEWARE
// ═══════════════════════════════════════════════════════════════════════════════

/// Middleware service for rate limiting
#[derive(Clone)]
pub struct RateLimitMiddleware<S> {
    inner: S,
    limiter: Arc<RateLimiter>,
    resolver: ClientIpResolver,
}

impl<S> Service<Request<Body>> for RateLimitMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Counting happens before the future is created, so it never waits on I/O.
        let ip = self.resolver.resolve(&req);
        let result = self.limiter.check(ip);
        let class = self.limiter.class();

        // Swap in a fresh clone so the readied service handles this request.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match result {
                RateLimitResult::Allowed { limit, remaining, reset_after } => {
                    let mut response = inner.call(req).await?;
                    insert_rate_headers(response.headers_mut(), limit, remaining, reset_after);
                    Ok(response)
                }
                RateLimitResult::RateLimited { limit, retry_after } => {
                    tracing::debug!(%ip, class = class.name(), "rate limit exceeded");
                    let mut response = Error::RateLimited {
                        message: class.denial_message().to_string(),
                        retry_after,
                    }
                    .into_response();
                    insert_rate_headers(response.headers_mut(), limit, 0, retry_after);
                    Ok(response)
                }
            }
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

fn insert_rate_headers(headers: &mut HeaderMap, limit: u32, remaining: u32, reset: Duration) {
    // Nested limiters each report; keep whichever has the fewest requests left.
    let current = headers
        .get("ratelimit-remaining")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u32>().ok());
    if current.is_some_and(|current| current <= remaining) {
        return;
    }

    headers.insert(HeaderName::from_static("ratelimit-limit"), HeaderValue::from(limit));
    headers.insert(HeaderName::from_static("ratelimit-remaining"), HeaderValue::from(remaining));
    headers.insert(
        HeaderName::from_static("ratelimit-reset"),
        HeaderValue::from(reset.as_secs()),
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLEANUP TASK
// ═══════════════════════════════════════════════════════════════════════════════

/// Spawn background cleanup task
pub fn spawn_cleanup_task(
    limiters: RateLimiters,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            limiters.cleanup();

            for limiter in limiters.all() {
                let stats = limiter.statistics();
                tracing::debug!(
                    class = stats.class.name(),
                    active_clients = stats.active_clients,
                    allowed = stats.allowed_requests,
                    rate_limited = stats.rate_limited_requests,
                    "rate limiter sweep"
                );
            }
        }
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// SECURITY HEADERS MIDDLEWARE
// ═══════════════════════════════════════════════════════════════════════════════

/// Layer for adding security headers
#[derive(Clone, Default)]
pub struct SecurityHeadersLayer;

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersMiddleware { inner }
    }
}

/// Middleware for security headers
#[derive(Clone)]
pub struct SecurityHeadersMiddleware<S> {
    inner: S,
}

const SECURITY_HEADERS: [(&str, &str); 6] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains"),
    ("cross-origin-opener-policy", "same-origin"),
    (
        "content-security-policy",
        "default-src 'self'; img-src 'self' data:; style-src 'self' 'unsafe-inline'; \
         connect-src 'self'; frame-ancestors 'none'; base-uri 'self'; form-action 'self'",
    ),
];

impl<S> Service<Request<Body>> for SecurityHeadersMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let mut response = inner.call(req).await?;
            let headers = response.headers_mut();

            for (name, value) in SECURITY_HEADERS {
                headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
            }
            headers.remove(header::SERVER);

            Ok(response)
        })
    }
}
