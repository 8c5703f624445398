use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use coach_progress_core::config::Config;
use coach_progress_core::memory_store::InMemoryProgressStore;
use coach_progress_core::report::pdf::PdfRenderer;
use coach_progress_core::ProgressStore;
use coach_progress_core::reset::{InMemoryTokenStore, LogDelivery};
use coach_progress_server::auth::{TokenAuthority, token_request};
use coach_progress_server::{AppState, build_router};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const TOKEN_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl+c: {e}");
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Log filter from `COACH_LOG_LEVEL`, falling back to `RUST_LOG`, default `info`.
    let log_env = std::env::var("COACH_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(log_env.clone())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .compact()
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::info!(%log_env, "coach_progress: log filter");

    let handle = PrometheusBuilder::new().install_recorder()?;

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration; aborting startup");
            std::process::exit(1);
        }
    };

    // `issue-token <role> <id> [hours]` prints a signed bearer token and exits.
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("issue-token") {
        let (identity, hours) = token_request(&args[1..])?;
        let token = TokenAuthority::new(&config.jwt_secret).issue(identity, hours)?;
        println!("{token}");
        return Ok(());
    }

    let store: Arc<dyn ProgressStore> = match &config.seed_file {
        Some(path) => Arc::new(InMemoryProgressStore::from_file(path).await?),
        None => {
            tracing::warn!("COACH_SEED_FILE not set; starting with an empty store");
            Arc::new(InMemoryProgressStore::new())
        }
    };
    let state = AppState::new(
        &config,
        store,
        Arc::new(InMemoryTokenStore::new()),
        Arc::new(LogDelivery),
        Arc::new(PdfRenderer),
    )
    .with_prometheus(handle);
    let state = Arc::new(state);

    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(TOKEN_SWEEP_INTERVAL);
        loop {
            tick.tick().await;
            match sweeper.resets.purge_expired(chrono::Utc::now()).await {
                Ok(0) => {}
                Ok(n) => tracing::debug!(purged = n, "expired reset tokens removed"),
                Err(e) => tracing::warn!(error = %e, "reset token sweep failed"),
            }
        }
    });

    let max_body_size = env_or("MAX_HTTP_BODY_SIZE", DEFAULT_MAX_BODY_BYTES);
    let timeout = Duration::from_secs(env_or(
        "COACH_REQUEST_TIMEOUT_SECS",
        DEFAULT_REQUEST_TIMEOUT_SECS,
    ));

    #[allow(deprecated)]
    let timeout_layer = TimeoutLayer::new(timeout);
    let app = build_router(state)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(timeout_layer);

    let addr: SocketAddr = std::env::var("ADDRESS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)));
    info!(%addr, max_body_bytes = max_body_size, timeout_secs = timeout.as_secs(), "starting HTTP server");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
