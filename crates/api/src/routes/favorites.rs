//! Per-user favorite learning paths.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::parse_learning_path_id;
use path_store::LearningPathStore;
use saga::DiagramService;

use super::learning_paths::{LearningPathResponse, to_responses};
use crate::AppState;
use crate::auth::Caller;
use crate::error::ApiError;

/// GET /api/learning-paths/favorites
#[tracing::instrument(skip(state))]
pub async fn list<S, D>(
    State(state): State<Arc<AppState<S, D>>>,
    caller: Caller,
) -> Result<Json<Vec<LearningPathResponse>>, ApiError>
where
    S: LearningPathStore + 'static,
    D: DiagramService + 'static,
{
    let user = caller.require_user()?;
    let paths = state.store().favorites(user).await?;
    Ok(Json(to_responses(paths)))
}

/// POST /api/learning-paths/{id}/favorite
#[tracing::instrument(skip(state))]
pub async fn add<S, D>(
    State(state): State<Arc<AppState<S, D>>>,
    Path(id): Path<String>,
    caller: Caller,
) -> Result<StatusCode, ApiError>
where
    S: LearningPathStore + 'static,
    D: DiagramService + 'static,
{
    let user = caller.require_user()?;
    let id = parse_learning_path_id(&id)?;
    state.store().add_favorite(user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/learning-paths/{id}/favorite
#[tracing::instrument(skip(state))]
pub async fn remove<S, D>(
    State(state): State<Arc<AppState<S, D>>>,
    Path(id): Path<String>,
    caller: Caller,
) -> Result<StatusCode, ApiError>
where
    S: LearningPathStore + 'static,
    D: DiagramService + 'static,
{
    let user = caller.require_user()?;
    let id = parse_learning_path_id(&id)?;
    state.store().remove_favorite(user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
