//! Saga error types.

use std::time::Duration;

use common::LearningPathId;
use domain::DomainError;
use path_store::StoreError;
use thiserror::Error;

use crate::context::Interrupt;
use crate::services::DiagramError;

/// The store that is left disagreeing with the other when a compensating
/// action fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Relational,
    Diagram,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Relational => "relational",
            StoreKind::Diagram => "diagram",
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a single forward or compensating action failed.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Diagram(#[from] DiagramError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The caller's context was cancelled or expired while the step ran.
    #[error("{0}")]
    Interrupted(Interrupt),

    /// A compensating action did not finish within its own time budget.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// An earlier step did not leave the value this step needs.
    #[error("missing saga context value: {0}")]
    MissingContext(&'static str),
}

impl StepError {
    /// Returns true for uniqueness violations in either store.
    pub fn is_conflict(&self) -> bool {
        match self {
            StepError::Store(e) => e.is_conflict(),
            StepError::Diagram(e) => e.is_name_conflict(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StepError::Store(e) if e.is_not_found())
    }
}

/// Outcome of a learning path saga that did not complete.
///
/// `Validation`, `NotFound` and `Store` are raised before anything was
/// mutated. The three step variants describe how far the saga got: a step
/// failed with nothing to undo, a step failed and was undone, or a step
/// failed and undoing it failed too.
#[derive(Debug, Error)]
pub enum SagaError {
    #[error("invalid request: {0}")]
    Validation(#[from] DomainError),

    #[error("learning path not found: {0}")]
    NotFound(LearningPathId),

    /// Loading the current row failed before any step ran.
    #[error("store error: {0}")]
    Store(StoreError),

    #[error("saga step {index} ({step}) failed: {source}")]
    StepFailed {
        saga: &'static str,
        index: usize,
        step: &'static str,
        source: StepError,
    },

    #[error("saga step {index} ({step}) failed: {source}; {restored}")]
    Compensated {
        saga: &'static str,
        index: usize,
        step: &'static str,
        source: StepError,
        restored: &'static str,
    },

    #[error(
        "saga step {index} ({step}) failed: {source}; compensation {compensation} also failed: \
         {compensation_error}; {inconsistent} store needs reconciliation for learning path {entity_id}"
    )]
    ReconciliationRequired {
        saga: &'static str,
        entity_id: LearningPathId,
        index: usize,
        step: &'static str,
        source: StepError,
        compensation: &'static str,
        compensation_error: StepError,
        inconsistent: StoreKind,
    },
}

impl SagaError {
    /// Returns true when the caller can succeed by choosing another title.
    ///
    /// Never true while a reconciliation is pending.
    pub fn is_conflict(&self) -> bool {
        match self {
            SagaError::StepFailed { source, .. } | SagaError::Compensated { source, .. } => {
                source.is_conflict()
            }
            _ => false,
        }
    }

    /// Returns true when the learning path does not exist, including when it
    /// vanished between load and the first write.
    pub fn is_not_found(&self) -> bool {
        match self {
            SagaError::NotFound(_) => true,
            SagaError::StepFailed { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    pub fn requires_reconciliation(&self) -> bool {
        matches!(self, SagaError::ReconciliationRequired { .. })
    }

    /// The note describing what compensation restored, if it ran.
    pub fn restored(&self) -> Option<&'static str> {
        match self {
            SagaError::Compensated { restored, .. } => Some(*restored),
            _ => None,
        }
    }

    /// The failing step's index (1-based), for step failures.
    pub fn step_index(&self) -> Option<usize> {
        match self {
            SagaError::StepFailed { index, .. }
            | SagaError::Compensated { index, .. }
            | SagaError::ReconciliationRequired { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict() -> StepError {
        StepError::Store(StoreError::DuplicateTitle("Rust".to_string()))
    }

    #[test]
    fn test_conflict_classification() {
        let failed = SagaError::StepFailed {
            saga: "CreateLearningPath",
            index: 1,
            step: "create_diagram",
            source: StepError::Diagram(DiagramError::NameConflict("taken".to_string())),
        };
        assert!(failed.is_conflict());

        let compensated = SagaError::Compensated {
            saga: "CreateLearningPath",
            index: 2,
            step: "insert_row",
            source: conflict(),
            restored: "diagram removed",
        };
        assert!(compensated.is_conflict());
        assert_eq!(compensated.restored(), Some("diagram removed"));

        let pending = SagaError::ReconciliationRequired {
            saga: "CreateLearningPath",
            entity_id: LearningPathId::new(),
            index: 2,
            step: "insert_row",
            source: conflict(),
            compensation: "delete_diagram",
            compensation_error: StepError::TimedOut(Duration::from_secs(5)),
            inconsistent: StoreKind::Diagram,
        };
        assert!(!pending.is_conflict());
        assert!(pending.requires_reconciliation());
    }

    #[test]
    fn test_messages_name_the_step_and_both_failures() {
        let entity_id = LearningPathId::new();
        let err = SagaError::ReconciliationRequired {
            saga: "CreateLearningPath",
            entity_id,
            index: 2,
            step: "insert_row",
            source: conflict(),
            compensation: "delete_diagram",
            compensation_error: StepError::Diagram(DiagramError::UnexpectedStatus {
                operation: "delete",
                status: 503,
                message: "service unavailable".to_string(),
            }),
            inconsistent: StoreKind::Diagram,
        };

        let message = err.to_string();
        assert!(message.starts_with("saga step 2 (insert_row) failed"));
        assert!(message.contains("already exists"));
        assert!(message.contains("delete_diagram also failed"));
        assert!(message.contains("503"));
        assert!(message.contains(&entity_id.to_string()));
        assert_eq!(err.step_index(), Some(2));
    }

    #[test]
    fn test_not_found_classification() {
        assert!(SagaError::NotFound(LearningPathId::new()).is_not_found());

        let vanished = SagaError::StepFailed {
            saga: "UpdateLearningPath",
            index: 1,
            step: "update_row",
            source: StepError::Store(StoreError::NotFound(LearningPathId::new())),
        };
        assert!(vanished.is_not_found());
        assert!(!vanished.is_conflict());
    }
}
