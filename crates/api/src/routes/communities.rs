//! Learning paths grouped by community.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use path_store::LearningPathStore;
use saga::DiagramService;

use super::learning_paths::{LearningPathResponse, to_responses};
use crate::AppState;
use crate::error::ApiError;

/// GET /api/communities/{community}/learning-paths
#[tracing::instrument(skip(state))]
pub async fn learning_paths<S, D>(
    State(state): State<Arc<AppState<S, D>>>,
    Path(community): Path<String>,
) -> Result<Json<Vec<LearningPathResponse>>, ApiError>
where
    S: LearningPathStore + 'static,
    D: DiagramService + 'static,
{
    let paths = state.store().list_by_community(&community).await?;
    Ok(Json(to_responses(paths)))
}
