//! Origin allow-list for the RPC endpoint.
//!
//! Only origins on the list get a reflected `Access-Control-Allow-Origin`.
//! Everything else is answered without CORS headers and the browser discards
//! the response. Preflight requests are answered here with 204 and never reach
//! the rate limiter or the gateway.

use std::collections::HashSet;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, Request, Response, StatusCode},
};
use futures::future::BoxFuture;
use tower::{Layer, Service};

use crate::utils::constants::CORS_MAX_AGE_SECS;

// ═══════════════════════════════════════════════════════════════════════════════
// POLICY
// ═══════════════════════════════════════════════════════════════════════════════

/// Set of origins allowed to call the RPC endpoint
#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    origins: Arc<HashSet<String>>,
}

impl CorsPolicy {
    /// Build a policy from exact origin strings such as `https://example.org`
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let origins = origins
            .into_iter()
            .map(|origin| origin.as_ref().trim().trim_end_matches('/').to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Self {
            origins: Arc::new(origins),
        }
    }

    /// Returns the origin to reflect, if the request carries an allowed one
    pub fn allowed_origin<'a>(&self, headers: &'a HeaderMap) -> Option<&'a HeaderValue> {
        let origin = headers.get(header::ORIGIN)?;
        let value = origin.to_str().ok()?;
        self.origins.contains(value).then_some(origin)
    }

    /// Number of allowed origins
    pub fn len(&self) -> usize {
        self.origins.len()
    }

    /// True if no origin is allowed
    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LAYER
// ═══════════════════════════════════════════════════════════════════════════════

/// Tower layer applying a [`CorsPolicy`]
#[derive(Clone)]
pub struct CorsLayer {
    policy: CorsPolicy,
}

impl CorsLayer {
    /// Create new CORS layer
    pub fn new(policy: CorsPolicy) -> Self {
        Self { policy }
    }
}

impl<S> Layer<S> for CorsLayer {
    type Service = CorsMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorsMiddleware {
            inner,
            policy: self.policy.clone(),
        }
    }
}

/// Middleware service for the origin allow-list
#[derive(Clone)]
pub struct CorsMiddleware<S> {
    inner: S,
    policy: CorsPolicy,
}

impl<S> Service<Request<Body>> for CorsMiddleware<S>
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
        let origin = self.policy.allowed_origin(req.headers()).cloned();

        if req.method() == Method::OPTIONS {
            let response = preflight_response(origin);
            return Box::pin(async move { Ok(response) });
        }

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let mut response = inner.call(req).await?;
            apply_origin(response.headers_mut(), origin);
            Ok(response)
        })
    }
}

fn apply_origin(headers: &mut HeaderMap, origin: Option<HeaderValue>) {
    headers.append(header::VARY, HeaderValue::from_static("Origin"));
    if let Some(origin) = origin {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
}

fn preflight_response(origin: Option<HeaderValue>) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;

    let allowed = origin.is_some();
    let headers = response.headers_mut();
    apply_origin(headers, origin);

    if allowed {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        );
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(CORS_MAX_AGE_SECS));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_origin(origin: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_str(origin).unwrap());
        headers
    }

    #[test]
    fn test_policy_normalizes_entries() {
        let policy = CorsPolicy::new([" https://example.org/ ", "", "https://www.example.org"]);
        assert_eq!(policy.len(), 2);
        assert!(policy.allowed_origin(&with_origin("https://example.org")).is_some());
    }

    #[test]
    fn test_unknown_origin_is_not_reflected() {
        let policy = CorsPolicy::new(["https://example.org"]);
        assert!(policy.allowed_origin(&with_origin("https://evil.example")).is_none());
        assert!(policy.allowed_origin(&with_origin("https://example.org.evil")).is_none());
        assert!(policy.allowed_origin(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_preflight_headers() {
        let allowed = preflight_response(Some(HeaderValue::from_static("https://example.org")));
        assert_eq!(allowed.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://example.org"
        );
        assert_eq!(allowed.headers()[header::ACCESS_CONTROL_ALLOW_METHODS], "POST, OPTIONS");

        let denied = preflight_response(None);
        assert_eq!(denied.status(), StatusCode::NO_CONTENT);
        assert!(denied.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert!(denied.headers().get(header::ACCESS_CONTROL_ALLOW_METHODS).is_none());
    }
}
