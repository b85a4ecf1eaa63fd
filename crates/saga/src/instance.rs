//! Saga execution journal.

use common::LearningPathId;
use uuid::Uuid;

use crate::events::SagaEvent;
use crate::state::SagaState;

/// The journal of one saga execution.
///
/// Built by applying `SagaEvent`s in order; the applied events are kept so a
/// failed run can be logged in full.
#[derive(Debug, Clone, Default)]
pub struct SagaInstance {
    id: Option<Uuid>,
    saga_type: String,
    entity_id: Option<LearningPathId>,
    state: SagaState,
    current_step: usize,
    completed_steps: Vec<String>,
    skipped_steps: Vec<String>,
    compensated_steps: Vec<String>,
    failed_compensations: Vec<String>,
    failure_reason: Option<String>,
    history: Vec<SagaEvent>,
}

impl SagaInstance {
    /// Applies an event to the journal.
    pub fn apply(&mut self, event: SagaEvent) {
        match &event {
            SagaEvent::SagaStarted(data) => {
                self.id = Some(data.saga_id);
                self.entity_id = Some(data.entity_id);
                self.saga_type = data.saga_type.clone();
                self.state = SagaState::Running;
            }
            SagaEvent::StepStarted(_) => {
                self.current_step += 1;
            }
            SagaEvent::StepCompleted(data) => {
                self.completed_steps.push(data.step_name.clone());
            }
            SagaEvent::StepFailed(data) => {
                self.failure_reason = Some(data.error.clone());
            }
            SagaEvent::StepSkipped(data) => {
                self.skipped_steps.push(data.step_name.clone());
            }
            SagaEvent::CompensationStarted(_) => {
                self.state = SagaState::Compensating;
            }
            SagaEvent::CompensationStepCompleted(data) => {
                self.compensated_steps.push(data.step_name.clone());
            }
            SagaEvent::CompensationStepFailed(data) => {
                self.failed_compensations.push(data.step_name.clone());
            }
            SagaEvent::SagaCompleted(_) => {
                self.state = SagaState::Completed;
            }
            SagaEvent::SagaFailed(data) => {
                self.state = if data.reconciliation_required {
                    SagaState::RequiresReconciliation
                } else {
                    SagaState::Failed
                };
                self.failure_reason = Some(data.reason.clone());
            }
        }
        self.history.push(event);
    }
}

// Query methods
impl SagaInstance {
    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn state(&self) -> SagaState {
        self.state
    }

    pub fn saga_type(&self) -> &str {
        &self.saga_type
    }

    /// Returns the learning path this saga operated on.
    pub fn entity_id(&self) -> Option<LearningPathId> {
        self.entity_id
    }

    /// Number of steps started so far.
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn completed_steps(&self) -> &[String] {
        &self.completed_steps
    }

    /// Best-effort steps that failed without failing the saga.
    pub fn skipped_steps(&self) -> &[String] {
        &self.skipped_steps
    }

    /// Compensating actions that ran successfully.
    pub fn compensated_steps(&self) -> &[String] {
        &self.compensated_steps
    }

    pub fn failed_compensations(&self) -> &[String] {
        &self.failed_compensations
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Every event applied, in order.
    pub fn history(&self) -> &[SagaEvent] {
        &self.history
    }
}
