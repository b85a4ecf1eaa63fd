//! Delete saga: soft-delete, remote delete, then purge.
//!
//! The soft delete goes first because it is cheap to undo, unlike the remote
//! delete.

use async_trait::async_trait;
use common::{Credential, LearningPathId};
use path_store::LearningPathStore;

use crate::error::{StepError, StoreKind};
use crate::runner::{Compensation, SagaStep};
use crate::services::DiagramService;

pub const SAGA_TYPE: &str = "DeleteLearningPath";

pub const STEP_SOFT_DELETE_ROW: &str = "soft_delete_row";
pub const STEP_DELETE_DIAGRAM: &str = "delete_diagram";
pub const STEP_PURGE_ROW: &str = "purge_row";
pub const COMPENSATE_RESTORE_ROW: &str = "restore_row";

/// State threaded through the delete saga.
#[derive(Debug)]
pub struct DeleteContext {
    pub id: LearningPathId,
    pub credential: Credential,
}

impl DeleteContext {
    pub fn new(id: LearningPathId, credential: Credential) -> Self {
        Self { id, credential }
    }
}

/// Step 1: hide the row from reads.
pub struct SoftDeleteRow<'a, S> {
    pub store: &'a S,
}

#[async_trait]
impl<'a, S> SagaStep<DeleteContext> for SoftDeleteRow<'a, S>
where
    S: LearningPathStore,
{
    fn name(&self) -> &'static str {
        STEP_SOFT_DELETE_ROW
    }

    async fn execute(&self, ctx: &mut DeleteContext) -> Result<(), StepError> {
        self.store.soft_delete(ctx.id).await?;
        Ok(())
    }

    fn compensation(&self) -> Option<Compensation> {
        Some(Compensation {
            name: COMPENSATE_RESTORE_ROW,
            restores: "learning path restored",
            inconsistent: StoreKind::Relational,
        })
    }

    async fn compensate(&self, ctx: &DeleteContext) -> Result<(), StepError> {
        self.store.restore(ctx.id).await?;
        Ok(())
    }
}

/// Step 2: delete the diagram. An already missing diagram counts as deleted.
pub struct DeleteDiagram<'a, D> {
    pub diagrams: &'a D,
}

#[async_trait]
impl<'a, D> SagaStep<DeleteContext> for DeleteDiagram<'a, D>
where
    D: DiagramService,
{
    fn name(&self) -> &'static str {
        STEP_DELETE_DIAGRAM
    }

    async fn execute(&self, ctx: &mut DeleteContext) -> Result<(), StepError> {
        self.diagrams
            .delete_for_learning_path(ctx.id, &ctx.credential)
            .await?;
        Ok(())
    }
}

/// Step 3: remove the row for good.
///
/// Best effort: a row left soft-deleted is invisible to reads and has no
/// diagram pointing at it.
pub struct PurgeRow<'a, S> {
    pub store: &'a S,
}

#[async_trait]
impl<'a, S> SagaStep<DeleteContext> for PurgeRow<'a, S>
where
    S: LearningPathStore,
{
    fn name(&self) -> &'static str {
        STEP_PURGE_ROW
    }

    async fn execute(&self, ctx: &mut DeleteContext) -> Result<(), StepError> {
        self.store.hard_delete(ctx.id).await?;
        Ok(())
    }

    fn best_effort(&self) -> bool {
        true
    }
}
