//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use path_store::StoreError;
use saga::SagaError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// The caller is not identified.
    Unauthorized(String),
    /// Input validation error.
    Domain(DomainError),
    /// Saga execution error.
    Saga(SagaError),
    /// Relational store error outside a saga.
    Store(StoreError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Domain(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Saga(err) => saga_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(&err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, String) {
    match &err {
        SagaError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
        _ if err.is_not_found() => (StatusCode::NOT_FOUND, err.to_string()),
        SagaError::StepFailed { source, .. } | SagaError::Compensated { source, .. }
            if source.is_conflict() =>
        {
            (StatusCode::CONFLICT, source.to_string())
        }
        SagaError::StepFailed { .. } | SagaError::Compensated { .. } => {
            tracing::warn!(error = %err, "saga failed, stores consistent");
            (
                StatusCode::BAD_GATEWAY,
                format!("operation failed, consistency preserved: {err}"),
            )
        }
        SagaError::ReconciliationRequired { .. } => {
            tracing::error!(error = %err, "saga failed, reconciliation pending");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "operation failed, reconciliation pending".to_string(),
            )
        }
        SagaError::Store(e) => store_error_to_response(e),
        SagaError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
    }
}

fn store_error_to_response(err: &StoreError) -> (StatusCode, String) {
    match err {
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        StoreError::DuplicateTitle(_) => (StatusCode::CONFLICT, err.to_string()),
        _ => {
            tracing::error!(error = %err, "store error");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
