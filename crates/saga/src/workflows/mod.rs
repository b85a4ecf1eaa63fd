//! The learning path sagas.
//!
//! Each workflow is a short ordered list of steps for `SagaRunner`:
//!
//! | saga   | step 1                        | step 2                          | step 3            |
//! |--------|-------------------------------|---------------------------------|-------------------|
//! | create | create diagram (undo: delete) | insert row with skills          |                   |
//! | update | update row (undo: write back) | rename diagram                  |                   |
//! | delete | soft-delete row (undo: restore) | delete diagram                | purge row (best effort) |

pub mod create;
pub mod delete;
pub mod update;

pub use create::{CreateContext, CreateDiagram, InsertLearningPath};
pub use delete::{DeleteContext, DeleteDiagram, PurgeRow, SoftDeleteRow};
pub use update::{RenameDiagram, UpdateContext, UpdateRow};
