//! Update saga: relational row first, then the diagram name.

use async_trait::async_trait;
use common::{Credential, LearningPathId};
use domain::{FieldValues, LearningPath};
use path_store::LearningPathStore;

use crate::error::{StepError, StoreKind};
use crate::runner::{Compensation, SagaStep};
use crate::services::DiagramService;

pub const SAGA_TYPE: &str = "UpdateLearningPath";

pub const STEP_UPDATE_ROW: &str = "update_row";
pub const STEP_RENAME_DIAGRAM: &str = "rename_diagram";
pub const COMPENSATE_RESTORE_FIELDS: &str = "restore_fields";

/// State threaded through the update saga.
#[derive(Debug)]
pub struct UpdateContext {
    pub id: LearningPathId,
    /// Values to write.
    pub target: FieldValues,
    /// Values before the update, written back on compensation.
    pub previous: FieldValues,
    pub credential: Credential,
    /// Set by `UpdateRow`.
    pub updated: Option<LearningPath>,
}

impl UpdateContext {
    pub fn new(
        id: LearningPathId,
        target: FieldValues,
        previous: FieldValues,
        credential: Credential,
    ) -> Self {
        Self {
            id,
            target,
            previous,
            credential,
            updated: None,
        }
    }
}

/// Step 1: overwrite title and description of the row.
pub struct UpdateRow<'a, S> {
    pub store: &'a S,
}

#[async_trait]
impl<'a, S> SagaStep<UpdateContext> for UpdateRow<'a, S>
where
    S: LearningPathStore,
{
    fn name(&self) -> &'static str {
        STEP_UPDATE_ROW
    }

    async fn execute(&self, ctx: &mut UpdateContext) -> Result<(), StepError> {
        let updated = self
            .store
            .update_fields(ctx.id, &ctx.target.title, &ctx.target.description)
            .await?;
        ctx.updated = Some(updated);
        Ok(())
    }

    fn compensation(&self) -> Option<Compensation> {
        Some(Compensation {
            name: COMPENSATE_RESTORE_FIELDS,
            restores: "learning path restored",
            inconsistent: StoreKind::Relational,
        })
    }

    async fn compensate(&self, ctx: &UpdateContext) -> Result<(), StepError> {
        self.store
            .update_fields(ctx.id, &ctx.previous.title, &ctx.previous.description)
            .await?;
        Ok(())
    }
}

/// Step 2: rename the diagram to the new title.
pub struct RenameDiagram<'a, D> {
    pub diagrams: &'a D,
}

#[async_trait]
impl<'a, D> SagaStep<UpdateContext> for RenameDiagram<'a, D>
where
    D: DiagramService,
{
    fn name(&self) -> &'static str {
        STEP_RENAME_DIAGRAM
    }

    async fn execute(&self, ctx: &mut UpdateContext) -> Result<(), StepError> {
        self.diagrams
            .rename(ctx.id, &ctx.target.title, &ctx.credential)
            .await?;
        Ok(())
    }
}
