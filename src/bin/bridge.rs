//! Marathon event-bus → InfluxDB bridge daemon
//!
//! Subscribes to the Marathon event stream, projects events into metric
//! points and forwards them to InfluxDB. A small admin HTTP server exposes
//! liveness and counters.
//!
//! # Endpoints
//!
//! - `GET /health` - Liveness and subscription phase
//! - `GET /metrics` - Bridge counters in Prometheus format
//!
//! # Configuration
//!
//! Resolved from, weakest first:
//! 1. Built-in defaults (`localhost:8086`/`marathon` for InfluxDB,
//!    `localhost:8080` for Marathon)
//! 2. `BRIDGE_CONFIG` environment variable (path to a TOML file), or
//!    `./bridge.toml`
//! 3. `INFLUX_HOST`/`INFLUX_PORT`/`INFLUX_DB` and
//!    `MARATHON_HOST`/`MARATHON_PORT` environment variables
//!
//! # Example
//!
//! ```bash
//! # Run against local defaults
//! ./bridge
//!
//! # Point at a remote pair
//! MARATHON_HOST=marathon.internal INFLUX_HOST=influx.internal ./bridge
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use marathon_event_bridge::{
    BridgeConfig, BridgeStats, DeliveryPipeline, InfluxSink, ProjectionRegistry, SseEventSource,
    SubscriptionManager,
};
use serde::Serialize;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Shared admin state
struct AppState {
    stats: Arc<BridgeStats>,
    manager: Arc<SubscriptionManager>,
}

/// Health response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    phase: String,
}

/// Liveness endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        phase: format!("{:?}", state.manager.phase()),
    })
}

/// Prometheus counters endpoint
async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.stats.snapshot().to_prometheus("event_bridge")
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("marathon_event_bridge=info".parse()?)
                .add_directive("bridge=info".parse()?),
        )
        .init();

    info!("Marathon event bridge starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = BridgeConfig::load();
    info!(
        marathon = %config.marathon.events_url(),
        influx = %config.influx.write_url(),
        "Configuration resolved"
    );

    // Wire the pipeline: sink <- delivery <- projection <- subscription
    let stats = Arc::new(BridgeStats::new());
    let sink = Arc::new(InfluxSink::new(&config.influx)?);
    let pipeline = Arc::new(DeliveryPipeline::new(
        &config.pipeline,
        sink,
        stats.clone(),
    ));
    let source = Arc::new(SseEventSource::new(&config.marathon)?);
    let manager = Arc::new(SubscriptionManager::new(
        source,
        ProjectionRegistry::new(),
        pipeline.clone(),
        stats.clone(),
    ));

    // Run the subscription in the background; a failed subscription is
    // reported but does not bring the process down.
    let (shutdown_tx, _) = broadcast::channel(1);
    let manager_task = {
        let manager = manager.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = manager.run(shutdown_rx).await {
                error!(error = %e, "Event bus subscription failed");
            }
        })
    };

    // Admin HTTP server
    let state = Arc::new(AppState {
        stats,
        manager: manager.clone(),
    });
    let app = build_router(state);
    let addr: SocketAddr = config.listen_addr.parse()?;
    info!("Starting admin HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the subscription, then let the pipeline drain what it holds.
    let _ = shutdown_tx.send(());
    let _ = manager_task.await;
    pipeline.shutdown().await;

    info!("Bridge shutdown complete");
    Ok(())
}
