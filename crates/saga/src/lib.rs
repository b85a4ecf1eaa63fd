//! Saga coordination for learning paths.
//!
//! A learning path lives in two independently failing systems: a row (with
//! its skills) in the relational store and a diagram record in the document
//! store. There is no shared transaction, so every write runs as a saga:
//!
//! - Create: create diagram → insert row (undo: delete diagram)
//! - Update: update row → rename diagram (undo: write old values back)
//! - Delete: soft-delete row → delete diagram → purge row (undo: restore row)
//!
//! If a compensating action fails too, the error is `ReconciliationRequired`
//! and names the store left inconsistent.

pub mod context;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod instance;
pub mod runner;
pub mod services;
pub mod state;
pub mod workflows;

pub use context::{CallContext, CancelHandle, Interrupt};
pub use coordinator::SagaCoordinator;
pub use error::{SagaError, StepError, StoreKind};
pub use events::SagaEvent;
pub use instance::SagaInstance;
pub use runner::{Compensation, DEFAULT_COMPENSATION_TIMEOUT, SagaRunner, SagaStep};
pub use services::{
    CreatedDiagram, DiagramError, DiagramRecord, DiagramService, HttpDiagramClient,
    InMemoryDiagramService, RemoteOutcome,
};
pub use state::SagaState;
