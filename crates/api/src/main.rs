//! API server entry point.

use std::sync::Arc;

use api::AppState;
use api::config::{Config, LogFormat};
use metrics_exporter_prometheus::PrometheusHandle;
use path_store::{InMemoryLearningPathStore, LearningPathStore, PostgresLearningPathStore};
use saga::{HttpDiagramClient, SagaCoordinator};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn describe_metrics() {
    metrics::describe_counter!("saga_executions_total", "Sagas started, by workflow");
    metrics::describe_counter!("saga_completed_total", "Sagas that completed every step");
    metrics::describe_counter!("saga_failed_total", "Sagas that failed, compensated or not");
    metrics::describe_counter!(
        "saga_compensations_total",
        "Compensating actions run, by workflow and step"
    );
    metrics::describe_counter!(
        "saga_reconciliation_required_total",
        "Sagas that left the stores inconsistent"
    );
    metrics::describe_histogram!(
        "saga_duration_seconds",
        metrics::Unit::Seconds,
        "Saga wall-clock duration"
    );
    metrics::describe_counter!(
        "path_store_writes_total",
        "Relational writes, by operation"
    );
}

async fn serve<S>(config: Config, store: S, metrics_handle: PrometheusHandle)
where
    S: LearningPathStore + 'static,
{
    let diagrams = HttpDiagramClient::new(&config.diagram_service_url, config.diagram_timeout)
        .expect("failed to build diagram service client");
    let coordinator = SagaCoordinator::new(store, diagrams)
        .with_compensation_timeout(config.compensation_timeout);
    let state = Arc::new(AppState::new(coordinator, config.request_timeout));
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, diagram_service = %config.diagram_service_url, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");
    describe_metrics();

    // 3. Pick the relational store and serve
    match config.database_url.clone() {
        Some(url) => {
            let store = PostgresLearningPathStore::connect(&url, config.database_max_connections)
                .await
                .expect("failed to connect to database");
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            serve(config, store, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            serve(config, InMemoryLearningPathStore::new(), metrics_handle).await;
        }
    }
}
