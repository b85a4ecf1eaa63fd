//! Saga coordinator for learning path create, update and delete.

use std::time::Duration;

use common::{Credential, LearningPathId};
use domain::{CreateLearningPath, FieldValues, LearningPath, UpdateLearningPath};
use path_store::LearningPathStore;

use crate::context::CallContext;
use crate::error::{Result, SagaError, StepError};
use crate::runner::SagaRunner;
use crate::services::DiagramService;
use crate::workflows::{self, create, delete, update};

/// Keeps the relational store and the diagram service consistent.
///
/// No lock spans the two stores. Ordering, idempotent remote calls and one
/// compensating action per step do the work; the relational title constraint
/// decides races between concurrent creates.
pub struct SagaCoordinator<S, D>
where
    S: LearningPathStore,
    D: DiagramService,
{
    store: S,
    diagrams: D,
    runner: SagaRunner,
}

impl<S, D> SagaCoordinator<S, D>
where
    S: LearningPathStore,
    D: DiagramService,
{
    /// Creates a new saga coordinator.
    pub fn new(store: S, diagrams: D) -> Self {
        Self {
            store,
            diagrams,
            runner: SagaRunner::default(),
        }
    }

    /// Sets the time budget of each compensating action.
    pub fn with_compensation_timeout(mut self, timeout: Duration) -> Self {
        self.runner = SagaRunner::new(timeout);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn diagrams(&self) -> &D {
        &self.diagrams
    }

    /// Creates a learning path and its diagram.
    ///
    /// The diagram is created first; if the row cannot be inserted, the
    /// diagram is deleted again.
    #[tracing::instrument(skip_all, fields(workflow = create::SAGA_TYPE, entity_id = tracing::field::Empty))]
    pub async fn create(
        &self,
        call: &CallContext,
        request: CreateLearningPath,
        credential: Credential,
    ) -> Result<LearningPath> {
        let request = request.validate()?;
        let id = LearningPathId::new();
        tracing::Span::current().record("entity_id", tracing::field::display(id));

        let create_diagram = workflows::CreateDiagram {
            diagrams: &self.diagrams,
        };
        let insert_row = workflows::InsertLearningPath { store: &self.store };

        let mut ctx = workflows::CreateContext::new(id, request, credential);
        self.runner
            .run(
                create::SAGA_TYPE,
                id,
                call,
                &mut ctx,
                &[&create_diagram, &insert_row],
            )
            .await?;

        ctx.created.ok_or_else(|| SagaError::StepFailed {
            saga: create::SAGA_TYPE,
            index: 2,
            step: create::STEP_INSERT_ROW,
            source: StepError::MissingContext("created"),
        })
    }

    /// Updates title and description of a learning path and renames its diagram.
    ///
    /// If the rename fails, the previous values are written back.
    #[tracing::instrument(skip_all, fields(workflow = update::SAGA_TYPE, entity_id = %id))]
    pub async fn update(
        &self,
        call: &CallContext,
        id: LearningPathId,
        patch: UpdateLearningPath,
        credential: Credential,
    ) -> Result<LearningPath> {
        let patch = patch.validate()?;
        let current = self.load(id).await?;

        let target = patch.resolve(&current);
        let previous = FieldValues::of(&current);

        let update_row = workflows::UpdateRow { store: &self.store };
        let rename_diagram = workflows::RenameDiagram {
            diagrams: &self.diagrams,
        };

        let mut ctx = workflows::UpdateContext::new(id, target, previous, credential);
        self.runner
            .run(
                update::SAGA_TYPE,
                id,
                call,
                &mut ctx,
                &[&update_row, &rename_diagram],
            )
            .await?;

        // Both stores agree at this point; a failed reload falls back to the
        // row returned by the update itself.
        match self.store.find(id).await {
            Ok(Some(path)) => return Ok(path),
            Ok(None) => tracing::warn!(%id, "updated learning path vanished before reload"),
            Err(e) => tracing::warn!(%id, error = %e, "reload after update failed"),
        }
        ctx.updated.ok_or_else(|| SagaError::StepFailed {
            saga: update::SAGA_TYPE,
            index: 1,
            step: update::STEP_UPDATE_ROW,
            source: StepError::MissingContext("updated"),
        })
    }

    /// Deletes a learning path and its diagram.
    ///
    /// The row is soft-deleted first and restored if the diagram cannot be
    /// deleted. Purging the row afterwards is best effort.
    #[tracing::instrument(skip_all, fields(workflow = delete::SAGA_TYPE, entity_id = %id))]
    pub async fn delete(
        &self,
        call: &CallContext,
        id: LearningPathId,
        credential: Credential,
    ) -> Result<()> {
        self.load(id).await?;

        let soft_delete = workflows::SoftDeleteRow { store: &self.store };
        let delete_diagram = workflows::DeleteDiagram {
            diagrams: &self.diagrams,
        };
        let purge = workflows::PurgeRow { store: &self.store };

        let mut ctx = workflows::DeleteContext::new(id, credential);
        self.runner
            .run(
                delete::SAGA_TYPE,
                id,
                call,
                &mut ctx,
                &[&soft_delete, &delete_diagram, &purge],
            )
            .await?;
        Ok(())
    }

    async fn load(&self, id: LearningPathId) -> Result<LearningPath> {
        self.store
            .find(id)
            .await
            .map_err(SagaError::Store)?
            .ok_or(SagaError::NotFound(id))
    }
}
