//! Site Gateway Server
//!
//! Serves the static site, the exchange ticker proxy and the node RPC proxy.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use site_gateway::config::GatewayConfig;
use site_gateway::rpc::middleware::spawn_cleanup_task;
use site_gateway::rpc::rate_limiter::RateLimits;
use site_gateway::server::{build_router, AppState};

/// Static site server with RPC and exchange ticker proxies
#[derive(Parser, Debug)]
#[command(name = "site-gateway")]
#[command(version = site_gateway::VERSION)]
#[command(about = "Static site server with RPC and exchange ticker proxies", long_about = None)]
struct Args {
    /// JSON configuration file; environment variables override it
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Static site root
    #[arg(short, long)]
    static_dir: Option<PathBuf>,

    /// Relax rate limits for local development
    #[arg(long)]
    development: bool,
}

fn load_config(args: &Args) -> anyhow::Result<GatewayConfig> {
    let mut config = match &args.config {
        Some(path) => GatewayConfig::load(path)?,
        None => GatewayConfig::default(),
    };

    config.apply_env(|key| std::env::var(key).ok())?;

    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(dir) = &args.static_dir {
        config.static_dir = dir.clone();
    }
    if args.development {
        config.limits = RateLimits::development();
    }

    config.validate()?;
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAIN
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args).context("invalid configuration")?;

    info!("Static files from {}", config.static_dir.display());
    info!("Trusting {} proxy hop(s)", config.trust_proxy_hops);
    info!("Allowed RPC origins: {:?}", config.allowed_origins);
    match &config.rpc {
        Some(rpc) => info!("RPC proxy forwarding to {}:{}", rpc.host, rpc.port),
        None => warn!("RPC_USER/RPC_PASSWORD not set, /rpc will answer 503"),
    }

    let addr = config.bind;
    let cleanup_interval = config.cleanup_interval_secs;

    let state = Arc::new(AppState::new(config)?);
    let cleanup = spawn_cleanup_task(state.limiters.clone(), cleanup_interval);
    let app = build_router(state);

    info!("Starting site gateway on {}", addr);
    info!("Endpoints:");
    info!("  GET  /health               - Health check");
    info!("  GET  /api/price-klingex    - KlingEx ticker");
    info!("  GET  /api/price-rabidrabbit - RabidRabbit ticker");
    info!("  POST /rpc                  - Node RPC proxy");
    info!("  GET  /downloads/*          - Downloads");
    info!("  GET  /*                    - Static site");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    cleanup.abort();
    Ok(())
}
