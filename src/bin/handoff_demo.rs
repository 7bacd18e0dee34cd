//! Demo host binary — loads configuration, builds the initial `Verifier`
//! and `RuntimeConfig`, and serves the library's demo router
//! (`handoff_auth::demo_app::build_router`). This binary is deliberately
//! thin: the router and its handlers live in the library so integration
//! tests can drive them directly with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use arc_swap::ArcSwap;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use handoff_auth::config::Config;
use handoff_auth::demo_app::{build_router, AppState};
use handoff_auth::error::AuthError;
use handoff_auth::metrics::Metrics;
use handoff_auth::storequery::memory::{InMemoryBucketIndex, InMemoryMultipartTable};
use handoff_auth::storequery::Registry as StoreQueryRegistry;
use handoff_auth::transport::http::HttpVerifier;
use handoff_auth::transport::rpc::RpcVerifier;
use handoff_auth::transport::{DynVerifier, Verifier};
use handoff_auth::HandoffEngine;

fn version_long() -> &'static str {
    static V: std::sync::OnceLock<String> = std::sync::OnceLock::new();
    V.get_or_init(|| format!("{} (built {})", env!("CARGO_PKG_VERSION"), env!("HANDOFF_BUILD_TIME")))
}

/// Demo host for the Handoff authentication core.
#[derive(Parser, Debug)]
#[command(name = "handoff-demo")]
#[command(version = version_long())]
#[command(author, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Listen address (overrides config)
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<String>,
}

fn build_verifier(config: &Config) -> Result<DynVerifier, AuthError> {
    if config.grpc_mode {
        let verifier: DynVerifier = Arc::new(RpcVerifier::connect(&config.channel_spec())?);
        Ok(verifier)
    } else {
        let verifier: DynVerifier = Arc::new(HttpVerifier::new(&config.handoff_uri, config.handoff_verify_ssl)?);
        Ok(verifier)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let initial_filter = EnvFilter::try_from_default_env()
        .or_else(|_| std::env::var("HANDOFF_LOG_LEVEL").map(EnvFilter::new))
        .unwrap_or_else(|_| EnvFilter::new("handoff_auth=debug,tower_http=debug"));
    tracing_subscriber::fmt().with_env_filter(initial_filter).init();

    let mut config = if let Some(ref path) = cli.config {
        Config::from_file(path)?
    } else {
        Config::load()
    };
    if let Some(ref addr) = cli.listen {
        config.listen_addr = addr.parse()?;
    }

    info!("Starting Handoff demo host v{} (built {})", env!("CARGO_PKG_VERSION"), env!("HANDOFF_BUILD_TIME"));
    info!("  Listen address: {}", config.listen_addr);
    info!("  Transport: {}", if config.grpc_mode { "gRPC" } else { "HTTP" });

    let metrics = if config.metrics_enabled { Some(Arc::new(Metrics::new())) } else { None };

    let verifier = build_verifier(&config)?;
    let runtime_config = Arc::new(ArcSwap::from_pointee(config.runtime_config()));
    let verifier_handle = Arc::new(ArcSwap::from_pointee(verifier));

    let engine = HandoffEngine::new(runtime_config.clone(), verifier_handle.clone(), metrics.clone());

    let state = Arc::new(AppState {
        engine,
        registry: StoreQueryRegistry::with_defaults(),
        bucket_index: InMemoryBucketIndex::new(),
        multipart_table: InMemoryMultipartTable::new(),
        metrics,
    });

    let app = build_router(state).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!("Handoff demo host listening on http://{}", config.listen_addr);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
