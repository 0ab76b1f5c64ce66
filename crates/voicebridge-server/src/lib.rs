//! Voice bridge server
//!
//! Accepts telephony WebSocket connections, bootstraps an upstream realtime
//! session per call, and bridges audio between the two until the call ends
//! or the idle reaper tears it down.

pub mod app;
pub mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use config::BridgeConfig;
use tokio::net::TcpListener;
use tracing::{info, warn};
use voicebridge_observability::{health_router, init_tracer_provider, HealthState, Metrics, TracerConfig};
use voicebridge_session::Reaper;

/// Load configuration from the environment and run the server until a
/// shutdown signal is received.
pub async fn run() -> anyhow::Result<()> {
    let config = BridgeConfig::from_env()?;
    run_with_config(config).await
}

pub async fn run_with_config(config: BridgeConfig) -> anyhow::Result<()> {
    init_tracing(&config.log_level);

    info!("starting voice bridge server");

    let metrics = Arc::new(Metrics::new()?);
    let ingress_state = app::build_ingress_state(&config, metrics.clone()).await?;

    let health_state = HealthState::new(metrics);

    let reaper = Reaper::new(ingress_state.registry.clone(), config.idle_timeout_ms);
    tokio::spawn(reaper.run());

    let app = voicebridge_telephony::router(ingress_state).merge(health_router(health_state));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    info!("voice bridge listening on http://{}", addr);
    info!("  telephony ingress:    ws://{}/call", addr);
    info!("  health check:         http://{}/healthz", addr);
    info!("  readiness check:      http://{}/readyz", addr);
    info!("  prometheus metrics:   http://{}/metrics", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("voice bridge server stopped");

    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let provider = init_tracer_provider(TracerConfig::default());
    opentelemetry::global::set_tracer_provider(provider);
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    use tokio::signal;

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
        _ = terminate => {
            warn!("received SIGTERM, shutting down");
        },
    }
}
