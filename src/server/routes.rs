//! Router assembly and HTTP handlers.
//!
//! Every request passes the general rate limiter. Ticker, download and RPC
//! routes add their own class on top. Preflight requests to `/rpc` are
//! answered by the CORS layer before the RPC limiter sees them.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    handler::HandlerWithoutStateExt,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, get_service, post, MethodRouter},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

use crate::error::{Error, Result};
use crate::exchange::fetchers::TickerOutcome;
use crate::rpc::cors::CorsLayer;
use crate::rpc::middleware::{RateLimitLayer, SecurityHeadersLayer};
use crate::server::state::AppState;
use crate::{SERVICE_NAME, VERSION};

// ═══════════════════════════════════════════════════════════════════════════════
// ROUTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Build the full application router
pub fn build_router(state: Arc<AppState>) -> Router {
    let resolver = state.resolver;
    let limiters = state.limiters.clone();
    let static_dir = state.config.static_dir.clone();

    let api: Router<Arc<AppState>> = Router::new()
        .route("/api/price-klingex", get(price_klingex))
        .route("/api/price-rabidrabbit", get(price_rabidrabbit))
        .route_layer(RateLimitLayer::new(limiters.api.clone(), resolver));

    // CORS wraps the method fallback too, so OPTIONS gets its 204 here.
    let rpc: MethodRouter<Arc<AppState>> = post(rpc_proxy)
        .route_layer(RateLimitLayer::new(limiters.rpc.clone(), resolver))
        .fallback(not_found)
        .layer(CorsLayer::new(state.cors.clone()));

    let downloads: MethodRouter = get_service(
        ServeDir::new(static_dir.join("downloads"))
            .not_found_service(not_found.into_service()),
    )
    .layer(RateLimitLayer::new(limiters.downloads.clone(), resolver));

    let site = ServeDir::new(&static_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(not_found.into_service());

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .route("/rpc", rpc)
        .nest_service("/downloads", downloads)
        .fallback_service(site)
        .layer(DefaultBodyLimit::max(state.config.max_request_body_bytes))
        .layer(RateLimitLayer::new(limiters.general.clone(), resolver))
        .layer(SecurityHeadersLayer)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ═══════════════════════════════════════════════════════════════════════════════
// API TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Health check body
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Always "ok" while the process serves requests
    pub status: &'static str,
    /// Service name
    pub service: &'static str,
    /// Crate version
    pub version: &'static str,
    /// True if node credentials are configured
    pub rpc_configured: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLERS
// ═══════════════════════════════════════════════════════════════════════════════

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        service: SERVICE_NAME,
        version: VERSION,
        rpc_configured: state.rpc_configured(),
    })
}

async fn price_klingex(State(state): State<Arc<AppState>>) -> Result<Json<TickerOutcome>> {
    let outcome = state
        .exchange
        .fetch_ticker(&state.config.exchanges.klingex)
        .await?;
    Ok(Json(outcome))
}

async fn price_rabidrabbit(State(state): State<Arc<AppState>>) -> Result<Json<TickerOutcome>> {
    let outcome = state
        .exchange
        .fetch_ticker(&state.config.exchanges.rabidrabbit)
        .await?;
    Ok(Json(outcome))
}

async fn rpc_proxy(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse> {
    if !state.rpc_configured() {
        return Err(Error::NotConfigured);
    }

    let body = body?;
    let reply = state.gateway.handle(&body).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], reply))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}
