//! Create saga: diagram first, then the relational row.

use async_trait::async_trait;
use common::{Credential, LearningPathId};
use domain::{CreateLearningPath, LearningPath, NewLearningPath};
use path_store::LearningPathStore;

use crate::error::{StepError, StoreKind};
use crate::runner::{Compensation, SagaStep};
use crate::services::DiagramService;

pub const SAGA_TYPE: &str = "CreateLearningPath";

pub const STEP_CREATE_DIAGRAM: &str = "create_diagram";
pub const STEP_INSERT_ROW: &str = "insert_row";
pub const COMPENSATE_DELETE_DIAGRAM: &str = "delete_diagram";

/// State threaded through the create saga.
#[derive(Debug)]
pub struct CreateContext {
    pub id: LearningPathId,
    pub request: CreateLearningPath,
    pub credential: Credential,
    /// Set by `CreateDiagram`.
    pub diagram_id: Option<String>,
    /// Set by `InsertLearningPath`.
    pub created: Option<LearningPath>,
}

impl CreateContext {
    pub fn new(id: LearningPathId, request: CreateLearningPath, credential: Credential) -> Self {
        Self {
            id,
            request,
            credential,
            diagram_id: None,
            created: None,
        }
    }
}

/// Step 1: create the diagram keyed by the new learning path id.
pub struct CreateDiagram<'a, D> {
    pub diagrams: &'a D,
}

#[async_trait]
impl<'a, D> SagaStep<CreateContext> for CreateDiagram<'a, D>
where
    D: DiagramService,
{
    fn name(&self) -> &'static str {
        STEP_CREATE_DIAGRAM
    }

    async fn execute(&self, ctx: &mut CreateContext) -> Result<(), StepError> {
        let created = self
            .diagrams
            .create_for_learning_path(ctx.id, &ctx.request.title, &ctx.credential)
            .await?;
        ctx.diagram_id = Some(created.diagram_id);
        Ok(())
    }

    fn compensation(&self) -> Option<Compensation> {
        Some(Compensation {
            name: COMPENSATE_DELETE_DIAGRAM,
            restores: "diagram removed",
            inconsistent: StoreKind::Diagram,
        })
    }

    async fn compensate(&self, ctx: &CreateContext) -> Result<(), StepError> {
        self.diagrams
            .delete_for_learning_path(ctx.id, &ctx.credential)
            .await?;
        Ok(())
    }
}

/// Step 2: insert the row and its skills in one transaction.
pub struct InsertLearningPath<'a, S> {
    pub store: &'a S,
}

#[async_trait]
impl<'a, S> SagaStep<CreateContext> for InsertLearningPath<'a, S>
where
    S: LearningPathStore,
{
    fn name(&self) -> &'static str {
        STEP_INSERT_ROW
    }

    async fn execute(&self, ctx: &mut CreateContext) -> Result<(), StepError> {
        let diagram_id = ctx
            .diagram_id
            .clone()
            .ok_or(StepError::MissingContext("diagram_id"))?;
        let request = &ctx.request;
        let row = NewLearningPath {
            id: ctx.id,
            title: request.title.clone(),
            description: request.description.clone(),
            is_public: request.is_public,
            thumbnail: request.thumbnail.clone(),
            community: request.community.clone(),
            diagram_id,
        };

        let created = self.store.create_with_skills(row, &request.skills).await?;
        ctx.created = Some(created);
        Ok(())
    }
}
