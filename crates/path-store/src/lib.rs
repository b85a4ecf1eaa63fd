//! Relational store for learning paths.
//!
//! Rows live in PostgreSQL; `InMemoryLearningPathStore` mirrors the schema's
//! constraints for tests and local runs.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{LearningPathId, UserId};
pub use error::{Result, StoreError};
pub use memory::InMemoryLearningPathStore;
pub use postgres::PostgresLearningPathStore;
pub use store::LearningPathStore;
