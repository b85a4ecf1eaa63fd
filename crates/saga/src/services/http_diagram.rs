//! HTTP client for the diagram service.

use std::time::Duration;

use async_trait::async_trait;
use common::{Credential, LearningPathId};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::diagram::{CreatedDiagram, DiagramError, DiagramRecord, DiagramService, RemoteOutcome};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBody<'a> {
    learning_path_id: LearningPathId,
    name: &'a str,
}

#[derive(Serialize)]
struct RenameBody<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Diagram service reached over HTTP.
///
/// Talks to `{base}/diagrams/by-lp`; every request carries the caller's
/// bearer token when one is present.
#[derive(Debug, Clone)]
pub struct HttpDiagramClient {
    client: Client,
    base_url: String,
}

impl HttpDiagramClient {
    /// Creates a client whose requests time out after `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DiagramError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Wraps an existing client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}/diagrams/by-lp", self.base_url)
    }

    fn item_url(&self, id: LearningPathId) -> String {
        format!("{}/diagrams/by-lp/{}", self.base_url, id)
    }

    fn request(&self, method: Method, url: String, credential: &Credential) -> RequestBuilder {
        let request = self.client.request(method, url);
        // No header at all for an empty credential; the service answers 401.
        match credential.bearer() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Extracts a human-readable message from an error response.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    if let Ok(body) = serde_json::from_str::<ErrorBody>(&text) {
        // 401 bodies look like {"error":"Unauthorized","message":"..."}; the message is the detail.
        let detail = if status == StatusCode::UNAUTHORIZED {
            body.message.or(body.error)
        } else {
            body.error.or(body.message)
        };
        if let Some(detail) = detail.filter(|d| !d.is_empty()) {
            return detail;
        }
    }

    let text = text.trim();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        text.to_string()
    }
}

async fn failure(operation: &'static str, response: Response) -> DiagramError {
    let status = response.status();
    let message = error_message(response).await;
    match status {
        StatusCode::CONFLICT => DiagramError::NameConflict(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DiagramError::Unauthorized {
            status: status.as_u16(),
            message,
        },
        _ => DiagramError::UnexpectedStatus {
            operation,
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl DiagramService for HttpDiagramClient {
    async fn create_for_learning_path(
        &self,
        id: LearningPathId,
        name: &str,
        credential: &Credential,
    ) -> Result<CreatedDiagram, DiagramError> {
        let response = self
            .request(Method::POST, self.collection_url(), credential)
            .json(&CreateBody {
                learning_path_id: id,
                name,
            })
            .send()
            .await?;

        let outcome = match response.status() {
            StatusCode::CREATED => RemoteOutcome::Applied,
            StatusCode::OK => RemoteOutcome::AlreadyApplied,
            _ => return Err(failure("create", response).await),
        };

        let record: DiagramRecord = response
            .json()
            .await
            .map_err(|e| DiagramError::InvalidResponse(e.to_string()))?;
        tracing::debug!(learning_path_id = %id, diagram_id = %record.id, ?outcome, "diagram created");

        Ok(CreatedDiagram {
            diagram_id: record.id,
            outcome,
        })
    }

    async fn rename(
        &self,
        id: LearningPathId,
        name: &str,
        credential: &Credential,
    ) -> Result<RemoteOutcome, DiagramError> {
        let response = self
            .request(Method::PATCH, self.item_url(id), credential)
            .json(&RenameBody { name })
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(RemoteOutcome::Applied),
            StatusCode::NOT_FOUND => {
                tracing::debug!(learning_path_id = %id, "no diagram to rename");
                Ok(RemoteOutcome::AlreadyApplied)
            }
            _ => Err(failure("rename", response).await),
        }
    }

    async fn delete_for_learning_path(
        &self,
        id: LearningPathId,
        credential: &Credential,
    ) -> Result<RemoteOutcome, DiagramError> {
        let response = self
            .request(Method::DELETE, self.item_url(id), credential)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(RemoteOutcome::Applied),
            StatusCode::NOT_FOUND => {
                tracing::debug!(learning_path_id = %id, "diagram already deleted");
                Ok(RemoteOutcome::AlreadyApplied)
            }
            _ => Err(failure("delete", response).await),
        }
    }
}
