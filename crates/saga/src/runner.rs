//! Generic saga runner.
//!
//! A saga is an ordered list of steps sharing a mutable context. Steps run
//! strictly in sequence. When one fails, the steps that already completed
//! are compensated in reverse order, each under its own time budget that
//! ignores the caller's cancellation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::LearningPathId;
use uuid::Uuid;

use crate::context::CallContext;
use crate::error::{SagaError, StepError, StoreKind};
use crate::events::SagaEvent;
use crate::instance::SagaInstance;

/// Budget for each compensating action unless configured otherwise.
pub const DEFAULT_COMPENSATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Describes how a completed step is undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compensation {
    /// Name of the compensating action, as logged and journaled.
    pub name: &'static str,
    /// What a successful compensation restores, reported to the caller.
    pub restores: &'static str,
    /// The store left out of step with the other if the compensation fails.
    pub inconsistent: StoreKind,
}

/// One forward action of a saga, with its optional compensating action.
#[async_trait]
pub trait SagaStep<C>: Send + Sync
where
    C: Send + Sync,
{
    fn name(&self) -> &'static str;

    async fn execute(&self, ctx: &mut C) -> Result<(), StepError>;

    /// `None` for steps with nothing to undo.
    fn compensation(&self) -> Option<Compensation> {
        None
    }

    async fn compensate(&self, _ctx: &C) -> Result<(), StepError> {
        Ok(())
    }

    /// Best-effort steps may fail without failing the saga.
    fn best_effort(&self) -> bool {
        false
    }
}

#[derive(Default)]
struct CompensationReport {
    restored: Option<&'static str>,
    failure: Option<(Compensation, StepError)>,
}

/// Executes sagas and classifies their outcome.
#[derive(Debug, Clone)]
pub struct SagaRunner {
    compensation_timeout: Duration,
}

impl Default for SagaRunner {
    fn default() -> Self {
        Self::new(DEFAULT_COMPENSATION_TIMEOUT)
    }
}

impl SagaRunner {
    pub fn new(compensation_timeout: Duration) -> Self {
        Self {
            compensation_timeout,
        }
    }

    pub fn compensation_timeout(&self) -> Duration {
        self.compensation_timeout
    }

    /// Runs `steps` in order against `ctx`.
    ///
    /// Returns the journal of a completed saga. Forward steps stop as soon as
    /// `call` is interrupted; compensation does not.
    pub async fn run<C>(
        &self,
        saga_type: &'static str,
        entity_id: LearningPathId,
        call: &CallContext,
        ctx: &mut C,
        steps: &[&dyn SagaStep<C>],
    ) -> Result<SagaInstance, SagaError>
    where
        C: Send + Sync,
    {
        metrics::counter!("saga_executions_total", "workflow" => saga_type).increment(1);
        let started = Instant::now();

        let mut saga = SagaInstance::default();
        saga.apply(SagaEvent::saga_started(Uuid::new_v4(), entity_id, saga_type));
        tracing::info!(saga = saga_type, %entity_id, "saga started");

        let mut completed: Vec<usize> = Vec::with_capacity(steps.len());

        for (position, step) in steps.iter().enumerate() {
            let index = position + 1;
            saga.apply(SagaEvent::step_started(step.name()));
            tracing::debug!(saga = saga_type, %entity_id, index, step = step.name(), "saga step started");

            let result = tokio::select! {
                biased;
                interrupt = call.interrupted() => Err(StepError::Interrupted(interrupt)),
                result = step.execute(ctx) => result,
            };

            let source = match result {
                Ok(()) => {
                    saga.apply(SagaEvent::step_completed(step.name()));
                    completed.push(position);
                    continue;
                }
                Err(error) if step.best_effort() => {
                    tracing::warn!(
                        saga = saga_type,
                        %entity_id,
                        index,
                        step = step.name(),
                        error = %error,
                        "best-effort saga step failed, continuing"
                    );
                    saga.apply(SagaEvent::step_skipped(step.name(), error.to_string()));
                    continue;
                }
                Err(error) => error,
            };

            saga.apply(SagaEvent::step_failed(step.name(), source.to_string()));
            let report = self
                .compensate(saga_type, &mut saga, &*ctx, steps, &completed, step.name())
                .await;

            let err = Self::classify(saga_type, entity_id, index, step.name(), source, report);
            let reconcile = err.requires_reconciliation();
            saga.apply(SagaEvent::saga_failed(err.to_string(), reconcile));

            metrics::counter!("saga_failed_total", "workflow" => saga_type).increment(1);
            metrics::histogram!("saga_duration_seconds", "workflow" => saga_type)
                .record(started.elapsed().as_secs_f64());

            if let SagaError::ReconciliationRequired {
                compensation,
                inconsistent,
                ..
            } = &err
            {
                metrics::counter!("saga_reconciliation_required_total", "workflow" => saga_type)
                    .increment(1);
                tracing::error!(
                    saga = saga_type,
                    %entity_id,
                    step = step.name(),
                    compensation = *compensation,
                    inconsistent_store = %inconsistent,
                    state = %saga.state(),
                    error = %err,
                    "saga compensation failed, reconciliation required"
                );
            } else {
                tracing::warn!(
                    saga = saga_type,
                    %entity_id,
                    step = step.name(),
                    state = %saga.state(),
                    error = %err,
                    "saga failed"
                );
            }
            return Err(err);
        }

        saga.apply(SagaEvent::saga_completed());
        metrics::counter!("saga_completed_total", "workflow" => saga_type).increment(1);
        metrics::histogram!("saga_duration_seconds", "workflow" => saga_type)
            .record(started.elapsed().as_secs_f64());
        tracing::info!(saga = saga_type, %entity_id, "saga completed");

        Ok(saga)
    }

    /// Undoes the completed steps, most recent first.
    ///
    /// A failed compensation does not stop the remaining ones.
    async fn compensate<C>(
        &self,
        saga_type: &'static str,
        saga: &mut SagaInstance,
        ctx: &C,
        steps: &[&dyn SagaStep<C>],
        completed: &[usize],
        failed_step: &'static str,
    ) -> CompensationReport
    where
        C: Send + Sync,
    {
        let mut report = CompensationReport::default();
        let pending: Vec<(usize, Compensation)> = completed
            .iter()
            .rev()
            .filter_map(|&position| steps[position].compensation().map(|c| (position, c)))
            .collect();
        if pending.is_empty() {
            return report;
        }

        saga.apply(SagaEvent::compensation_started(failed_step));

        for (position, compensation) in pending {
            metrics::counter!(
                "saga_compensations_total",
                "workflow" => saga_type,
                "step" => compensation.name
            )
            .increment(1);

            let result = tokio::time::timeout(
                self.compensation_timeout,
                steps[position].compensate(ctx),
            )
            .await
            .unwrap_or(Err(StepError::TimedOut(self.compensation_timeout)));

            match result {
                Ok(()) => {
                    saga.apply(SagaEvent::compensation_step_completed(compensation.name));
                    report.restored = Some(compensation.restores);
                }
                Err(error) => {
                    saga.apply(SagaEvent::compensation_step_failed(
                        compensation.name,
                        error.to_string(),
                    ));
                    if report.failure.is_none() {
                        report.failure = Some((compensation, error));
                    }
                }
            }
        }

        report
    }

    fn classify(
        saga: &'static str,
        entity_id: LearningPathId,
        index: usize,
        step: &'static str,
        source: StepError,
        report: CompensationReport,
    ) -> SagaError {
        match report {
            CompensationReport {
                failure: Some((compensation, compensation_error)),
                ..
            } => SagaError::ReconciliationRequired {
                saga,
                entity_id,
                index,
                step,
                source,
                compensation: compensation.name,
                compensation_error,
                inconsistent: compensation.inconsistent,
            },
            CompensationReport {
                restored: Some(restored),
                failure: None,
            } => SagaError::Compensated {
                saga,
                index,
                step,
                source,
                restored,
            },
            CompensationReport {
                restored: None,
                failure: None,
            } => SagaError::StepFailed {
                saga,
                index,
                step,
                source,
            },
        }
    }
}
