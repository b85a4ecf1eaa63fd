//! Diagram service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::{Credential, LearningPathId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A diagram record as held by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramRecord {
    /// Document-store generated identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Functional key: one diagram per learning path.
    pub learning_path_id: LearningPathId,
    /// Mirrors the learning path title.
    pub name: String,
}

/// Whether a remote call changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// The call performed the change.
    Applied,
    /// The remote side was already in the requested state (existing record
    /// on create, missing record on rename or delete).
    AlreadyApplied,
}

/// Result of a create-by-key call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedDiagram {
    pub diagram_id: String,
    pub outcome: RemoteOutcome,
}

/// Failures of the diagram service that are not tolerated as success.
#[derive(Debug, Error)]
pub enum DiagramError {
    /// Another learning path's diagram already uses this name.
    /// Carries the service's message unchanged.
    #[error("{0}")]
    NameConflict(String),

    /// The service rejected the caller's credential.
    #[error("diagram service rejected the credential ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// Any other non-success status.
    #[error("diagram {operation} returned status {status}: {message}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
        message: String,
    },

    /// The request never got a response (connection refused, timeout).
    #[error("diagram service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success status carried a body that could not be understood.
    #[error("invalid diagram service response: {0}")]
    InvalidResponse(String),
}

impl DiagramError {
    pub fn is_name_conflict(&self) -> bool {
        matches!(self, DiagramError::NameConflict(_))
    }
}

/// Create, rename and delete of diagram records keyed by learning path.
///
/// Every operation is idempotent on the learning path identifier, so a call
/// can be retried after a timeout without duplicating or losing records.
#[async_trait]
pub trait DiagramService: Send + Sync {
    /// Creates the diagram for a learning path, or returns the existing one.
    async fn create_for_learning_path(
        &self,
        id: LearningPathId,
        name: &str,
        credential: &Credential,
    ) -> Result<CreatedDiagram, DiagramError>;

    /// Renames the diagram of a learning path. A missing diagram is not an error.
    async fn rename(
        &self,
        id: LearningPathId,
        name: &str,
        credential: &Credential,
    ) -> Result<RemoteOutcome, DiagramError>;

    /// Deletes the diagram of a learning path. A missing diagram is not an error.
    async fn delete_for_learning_path(
        &self,
        id: LearningPathId,
        credential: &Credential,
    ) -> Result<RemoteOutcome, DiagramError>;
}

#[derive(Debug)]
struct InMemoryDiagramState {
    diagrams: HashMap<LearningPathId, DiagramRecord>,
    next_id: u32,
    unique_names: bool,
    fail_on_create: bool,
    fail_on_rename: bool,
    fail_on_delete: bool,
    delay: Option<Duration>,
    create_calls: usize,
    rename_calls: usize,
    delete_calls: usize,
}

impl Default for InMemoryDiagramState {
    fn default() -> Self {
        Self {
            diagrams: HashMap::new(),
            next_id: 0,
            unique_names: true,
            fail_on_create: false,
            fail_on_rename: false,
            fail_on_delete: false,
            delay: None,
            create_calls: 0,
            rename_calls: 0,
            delete_calls: 0,
        }
    }
}

/// In-memory diagram service for testing.
///
/// Behaves like the real service: bearer credential required, names unique
/// across learning paths, 404s on rename and delete reported as already applied.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDiagramService {
    state: Arc<RwLock<InMemoryDiagramState>>,
}

impl InMemoryDiagramService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every create call fail with a 503.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Makes every rename call fail with a 503.
    pub fn set_fail_on_rename(&self, fail: bool) {
        self.state.write().unwrap().fail_on_rename = fail;
    }

    /// Makes every delete call fail with a 503.
    pub fn set_fail_on_delete(&self, fail: bool) {
        self.state.write().unwrap().fail_on_delete = fail;
    }

    /// Delays every call by the given duration before it is served.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.write().unwrap().delay = delay;
    }

    /// Turns the cross-key name uniqueness check on or off.
    pub fn set_unique_names(&self, unique: bool) {
        self.state.write().unwrap().unique_names = unique;
    }

    /// Drops a record behind the coordinator's back.
    pub fn forget(&self, id: LearningPathId) {
        self.state.write().unwrap().diagrams.remove(&id);
    }

    pub fn diagram_count(&self) -> usize {
        self.state.read().unwrap().diagrams.len()
    }

    pub fn has_diagram(&self, id: LearningPathId) -> bool {
        self.state.read().unwrap().diagrams.contains_key(&id)
    }

    pub fn diagram(&self, id: LearningPathId) -> Option<DiagramRecord> {
        self.state.read().unwrap().diagrams.get(&id).cloned()
    }

    pub fn create_calls(&self) -> usize {
        self.state.read().unwrap().create_calls
    }

    pub fn rename_calls(&self) -> usize {
        self.state.read().unwrap().rename_calls
    }

    pub fn delete_calls(&self) -> usize {
        self.state.read().unwrap().delete_calls
    }

    fn authorize(credential: &Credential) -> Result<(), DiagramError> {
        match credential.bearer() {
            Some(_) => Ok(()),
            None => Err(DiagramError::Unauthorized {
                status: 401,
                message: "No access token provided".to_string(),
            }),
        }
    }

    fn unavailable(operation: &'static str) -> DiagramError {
        DiagramError::UnexpectedStatus {
            operation,
            status: 503,
            message: "service unavailable".to_string(),
        }
    }

    async fn pause(&self) {
        let delay = self.state.read().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl DiagramService for InMemoryDiagramService {
    async fn create_for_learning_path(
        &self,
        id: LearningPathId,
        name: &str,
        credential: &Credential,
    ) -> Result<CreatedDiagram, DiagramError> {
        self.state.write().unwrap().create_calls += 1;
        Self::authorize(credential)?;
        self.pause().await;

        let mut state = self.state.write().unwrap();
        if state.fail_on_create {
            return Err(Self::unavailable("create"));
        }

        if let Some(existing) = state.diagrams.get(&id) {
            return Ok(CreatedDiagram {
                diagram_id: existing.id.clone(),
                outcome: RemoteOutcome::AlreadyApplied,
            });
        }

        if state.unique_names && state.diagrams.values().any(|d| d.name == name) {
            return Err(DiagramError::NameConflict(
                "A learning path with this name already exists".to_string(),
            ));
        }

        state.next_id += 1;
        let record = DiagramRecord {
            id: format!("diagram-{:04}", state.next_id),
            learning_path_id: id,
            name: name.to_string(),
        };
        let diagram_id = record.id.clone();
        state.diagrams.insert(id, record);

        Ok(CreatedDiagram {
            diagram_id,
            outcome: RemoteOutcome::Applied,
        })
    }

    async fn rename(
        &self,
        id: LearningPathId,
        name: &str,
        credential: &Credential,
    ) -> Result<RemoteOutcome, DiagramError> {
        self.state.write().unwrap().rename_calls += 1;
        Self::authorize(credential)?;
        self.pause().await;

        let mut state = self.state.write().unwrap();
        if state.fail_on_rename {
            return Err(Self::unavailable("rename"));
        }

        match state.diagrams.get_mut(&id) {
            Some(record) => {
                record.name = name.to_string();
                Ok(RemoteOutcome::Applied)
            }
            None => Ok(RemoteOutcome::AlreadyApplied),
        }
    }

    async fn delete_for_learning_path(
        &self,
        id: LearningPathId,
        credential: &Credential,
    ) -> Result<RemoteOutcome, DiagramError> {
        self.state.write().unwrap().delete_calls += 1;
        Self::authorize(credential)?;
        self.pause().await;

        let mut state = self.state.write().unwrap();
        if state.fail_on_delete {
            return Err(Self::unavailable("delete"));
        }

        match state.diagrams.remove(&id) {
            Some(_) => Ok(RemoteOutcome::Applied),
            None => Ok(RemoteOutcome::AlreadyApplied),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> Credential {
        Credential::new("token")
    }

    #[tokio::test]
    async fn test_create_is_idempotent_by_key() {
        let service = InMemoryDiagramService::new();
        let id = LearningPathId::new();

        let first = service
            .create_for_learning_path(id, "Rust", &token())
            .await
            .unwrap();
        let retry = service
            .create_for_learning_path(id, "Rust", &token())
            .await
            .unwrap();

        assert_eq!(first.outcome, RemoteOutcome::Applied);
        assert_eq!(retry.outcome, RemoteOutcome::AlreadyApplied);
        assert_eq!(first.diagram_id, retry.diagram_id);
        assert_eq!(service.diagram_count(), 1);
        assert_eq!(service.create_calls(), 2);
    }

    #[tokio::test]
    async fn test_name_collision_with_other_key() {
        let service = InMemoryDiagramService::new();
        service
            .create_for_learning_path(LearningPathId::new(), "Rust", &token())
            .await
            .unwrap();

        let err = service
            .create_for_learning_path(LearningPathId::new(), "Rust", &token())
            .await
            .unwrap_err();
        assert!(err.is_name_conflict());
        assert_eq!(
            err.to_string(),
            "A learning path with this name already exists"
        );

        service.set_unique_names(false);
        service
            .create_for_learning_path(LearningPathId::new(), "Rust", &token())
            .await
            .unwrap();
        assert_eq!(service.diagram_count(), 2);
    }

    #[tokio::test]
    async fn test_missing_records_are_tolerated() {
        let service = InMemoryDiagramService::new();
        let id = LearningPathId::new();

        assert_eq!(
            service.rename(id, "x", &token()).await.unwrap(),
            RemoteOutcome::AlreadyApplied
        );
        assert_eq!(
            service.delete_for_learning_path(id, &token()).await.unwrap(),
            RemoteOutcome::AlreadyApplied
        );
    }

    #[tokio::test]
    async fn test_rename_and_delete() {
        let service = InMemoryDiagramService::new();
        let id = LearningPathId::new();
        service
            .create_for_learning_path(id, "Old", &token())
            .await
            .unwrap();

        service.rename(id, "New", &token()).await.unwrap();
        assert_eq!(service.diagram(id).unwrap().name, "New");

        assert_eq!(
            service.delete_for_learning_path(id, &token()).await.unwrap(),
            RemoteOutcome::Applied
        );
        assert!(!service.has_diagram(id));
    }

    #[tokio::test]
    async fn test_empty_credential_is_rejected_remotely() {
        let service = InMemoryDiagramService::new();
        let err = service
            .create_for_learning_path(LearningPathId::new(), "Rust", &Credential::anonymous())
            .await
            .unwrap_err();

        assert!(matches!(err, DiagramError::Unauthorized { status: 401, .. }));
        // The call still reached the service.
        assert_eq!(service.create_calls(), 1);
        assert_eq!(service.diagram_count(), 0);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let service = InMemoryDiagramService::new();
        let id = LearningPathId::new();
        service
            .create_for_learning_path(id, "Rust", &token())
            .await
            .unwrap();

        service.set_fail_on_delete(true);
        let err = service
            .delete_for_learning_path(id, &token())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DiagramError::UnexpectedStatus {
                operation: "delete",
                status: 503,
                ..
            }
        ));
        assert!(service.has_diagram(id));
    }
}
