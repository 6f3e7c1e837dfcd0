//! Kiosk Survey API Server
//!
//! Records kiosk survey responses, serves the aggregated reports, and hosts
//! the pre-built kiosk and report pages.

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod config;
pub mod content;
pub mod error;
pub mod routes;

use crate::content::ContentRoots;
use data_validator::Validator;
use storage::ResponseRepository;

pub use crate::config::{ConfigError, LoggingConfig, Settings};

/// Application state shared across handlers
pub struct AppState {
    /// Storage repository
    pub repository: Arc<dyn ResponseRepository>,
    /// Submission validator
    pub validator: Validator,
    /// Where pages and assets are looked up
    pub content: ContentRoots,
    /// Prometheus handle, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(repository: Arc<dyn ResponseRepository>, content: ContentRoots) -> Self {
        Self {
            repository,
            validator: Validator::new(),
            content,
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }

    /// Attach a Prometheus handle for `/metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(routes::health::health_handler))
        .route("/api/debug/echo", post(routes::debug::echo))
        .route("/api/debug/dbinfo", get(routes::debug::dbinfo))
        .route(
            "/api/respuestas",
            post(routes::responses::create_response).get(routes::responses::list_responses),
        )
        .route("/api/resumen", get(routes::summary::get_summary))
        .route("/metrics", get(routes::health::metrics_handler))
        .route("/comedor", get(routes::pages::comedor))
        .route("/transporte", get(routes::pages::transporte))
        .route("/reportes", get(routes::pages::reportes))
        .route("/assets/*file", get(routes::pages::assets))
        .route("/css/*file", get(routes::pages::css))
        .route("/js/*file", get(routes::pages::js))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    config.init().context("Failed to set tracing subscriber")
}

/// Install the global Prometheus recorder
pub fn install_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            None
        }
    }
}

/// Apply pending migrations. Outside strict mode a failure is logged and the
/// server starts anyway.
pub async fn prepare_schema(
    repository: &dyn ResponseRepository,
    strict: bool,
) -> anyhow::Result<()> {
    match storage::migrate(repository).await {
        Ok(report) => info!(
            "Schema at version {} (applied {:?})",
            report.current_version, report.applied
        ),
        Err(e) if !strict => {
            warn!("Schema migration failed, continuing: {}", e);
        }
        Err(e) => return Err(e).context("Schema migration failed"),
    }
    Ok(())
}

/// Connect storage, apply migrations, then serve until shutdown
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let target = settings.database_target();
    let repository = storage::connect(&target, settings.db_max_connections)
        .await
        .with_context(|| format!("Failed to open {} database", target.engine()))?;

    prepare_schema(repository.as_ref(), settings.strict_migrations).await?;

    let mut state = AppState::new(repository, settings.content.clone());
    if let Some(handle) = install_metrics() {
        state = state.with_metrics(handle);
    }
    let app = create_router(Arc::new(state));

    let address = settings.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Starting API server on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
