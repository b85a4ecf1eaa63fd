//! Learning path CRUD endpoints.
//!
//! Create, update and delete run as sagas on their own task so a client
//! disconnect cannot interrupt compensation halfway.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{CreateLearningPath, LearningPath, Skill, UpdateLearningPath, parse_learning_path_id};
use path_store::LearningPathStore;
use saga::DiagramService;
use serde::{Deserialize, Serialize};
use tokio::task::JoinError;

use crate::AppState;
use crate::auth::Caller;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateLearningPathRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub community: String,
}

impl From<CreateLearningPathRequest> for CreateLearningPath {
    fn from(req: CreateLearningPathRequest) -> Self {
        CreateLearningPath::new(req.title, req.community)
            .with_description(req.description)
            .with_visibility(req.is_public)
            .with_thumbnail(req.thumbnail)
            .with_skills(req.skills)
    }
}

/// Partial update. Only title and description can change.
#[derive(Deserialize)]
pub struct UpdateLearningPathRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct SkillResponse {
    pub id: i64,
    pub name: String,
}

#[derive(Serialize)]
pub struct LearningPathResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub is_public: bool,
    pub thumbnail: String,
    pub community: String,
    pub diagram_id: String,
    pub created_at: String,
    pub updated_at: String,
    /// Absent when the skills could not be reloaded after a write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<SkillResponse>>,
}

impl From<LearningPath> for LearningPathResponse {
    fn from(path: LearningPath) -> Self {
        Self {
            id: path.id.to_string(),
            title: path.title,
            description: path.description,
            is_public: path.is_public,
            thumbnail: path.thumbnail,
            community: path.community,
            diagram_id: path.diagram_id,
            created_at: path.created_at.to_rfc3339(),
            updated_at: path.updated_at.to_rfc3339(),
            skills: path.skills.map(|skills| {
                skills
                    .into_iter()
                    .map(|Skill { id, name }| SkillResponse { id, name })
                    .collect()
            }),
        }
    }
}

pub(crate) fn to_responses(paths: Vec<LearningPath>) -> Vec<LearningPathResponse> {
    paths.into_iter().map(LearningPathResponse::from).collect()
}

pub(crate) fn join_error(err: JoinError) -> ApiError {
    ApiError::Internal(format!("saga task failed: {err}"))
}

// -- Handlers --

/// GET /api/learning-paths
#[tracing::instrument(skip(state))]
pub async fn list<S, D>(
    State(state): State<Arc<AppState<S, D>>>,
) -> Result<Json<Vec<LearningPathResponse>>, ApiError>
where
    S: LearningPathStore + 'static,
    D: DiagramService + 'static,
{
    let paths = state.store().list().await?;
    Ok(Json(to_responses(paths)))
}

/// POST /api/learning-paths
#[tracing::instrument(skip(state, caller, req))]
pub async fn create<S, D>(
    State(state): State<Arc<AppState<S, D>>>,
    caller: Caller,
    Json(req): Json<CreateLearningPathRequest>,
) -> Result<(StatusCode, Json<LearningPathResponse>), ApiError>
where
    S: LearningPathStore + 'static,
    D: DiagramService + 'static,
{
    let request = CreateLearningPath::from(req);
    let (call, _cancel) = state.call_context();
    let task_state = state.clone();

    let path = tokio::spawn(async move {
        task_state
            .coordinator
            .create(&call, request, caller.credential)
            .await
    })
    .await
    .map_err(join_error)??;

    Ok((StatusCode::CREATED, Json(path.into())))
}

/// GET /api/learning-paths/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S, D>(
    State(state): State<Arc<AppState<S, D>>>,
    Path(id): Path<String>,
) -> Result<Json<LearningPathResponse>, ApiError>
where
    S: LearningPathStore + 'static,
    D: DiagramService + 'static,
{
    let id = parse_learning_path_id(&id)?;
    let path = state
        .store()
        .find(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("learning path not found: {id}")))?;
    Ok(Json(path.into()))
}

/// PATCH /api/learning-paths/{id}
#[tracing::instrument(skip(state, caller, req))]
pub async fn update<S, D>(
    State(state): State<Arc<AppState<S, D>>>,
    Path(id): Path<String>,
    caller: Caller,
    Json(req): Json<UpdateLearningPathRequest>,
) -> Result<Json<LearningPathResponse>, ApiError>
where
    S: LearningPathStore + 'static,
    D: DiagramService + 'static,
{
    let id = parse_learning_path_id(&id)?;
    let patch = UpdateLearningPath {
        title: req.title,
        description: req.description,
    };
    let (call, _cancel) = state.call_context();
    let task_state = state.clone();

    let path = tokio::spawn(async move {
        task_state
            .coordinator
            .update(&call, id, patch, caller.credential)
            .await
    })
    .await
    .map_err(join_error)??;

    Ok(Json(path.into()))
}

/// DELETE /api/learning-paths/{id}
#[tracing::instrument(skip(state, caller))]
pub async fn delete<S, D>(
    State(state): State<Arc<AppState<S, D>>>,
    Path(id): Path<String>,
    caller: Caller,
) -> Result<StatusCode, ApiError>
where
    S: LearningPathStore + 'static,
    D: DiagramService + 'static,
{
    let id = parse_learning_path_id(&id)?;
    let (call, _cancel) = state.call_context();
    let task_state = state.clone();

    tokio::spawn(async move {
        task_state
            .coordinator
            .delete(&call, id, caller.credential)
            .await
    })
    .await
    .map_err(join_error)??;

    Ok(StatusCode::NO_CONTENT)
}
