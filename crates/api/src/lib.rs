//! HTTP API for learning paths.
//!
//! Writes go through the saga coordinator so the relational store and the
//! diagram service stay consistent; reads and favorites go straight to the
//! relational store. Structured logging comes from tracing and metrics are
//! exported in Prometheus format.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use path_store::LearningPathStore;
use saga::{CallContext, CancelHandle, DiagramService, SagaCoordinator};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S, D>
where
    S: LearningPathStore,
    D: DiagramService,
{
    pub coordinator: SagaCoordinator<S, D>,
    pub request_timeout: Duration,
}

impl<S, D> AppState<S, D>
where
    S: LearningPathStore,
    D: DiagramService,
{
    pub fn new(coordinator: SagaCoordinator<S, D>, request_timeout: Duration) -> Self {
        Self {
            coordinator,
            request_timeout,
        }
    }

    pub fn store(&self) -> &S {
        self.coordinator.store()
    }

    /// Context for one saga call: bounded by the request timeout and
    /// cancelled when the returned handle is dropped.
    pub fn call_context(&self) -> (CallContext, CancelHandle) {
        let (call, cancel) = CallContext::cancellable();
        (call.with_timeout(self.request_timeout), cancel)
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, D>(state: Arc<AppState<S, D>>, metrics_handle: PrometheusHandle) -> Router
where
    S: LearningPathStore + 'static,
    D: DiagramService + 'static,
{
    use routes::{communities, favorites, learning_paths};

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/api/learning-paths",
            get(learning_paths::list::<S, D>).post(learning_paths::create::<S, D>),
        )
        .route(
            "/api/learning-paths/favorites",
            get(favorites::list::<S, D>),
        )
        .route(
            "/api/learning-paths/{id}",
            get(learning_paths::get::<S, D>)
                .patch(learning_paths::update::<S, D>)
                .delete(learning_paths::delete::<S, D>),
        )
        .route(
            "/api/learning-paths/{id}/favorite",
            post(favorites::add::<S, D>).delete(favorites::remove::<S, D>),
        )
        .route(
            "/api/communities/{community}/learning-paths",
            get(communities::learning_paths::<S, D>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
