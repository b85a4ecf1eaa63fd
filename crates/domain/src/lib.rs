//! Domain layer for learning paths.
//!
//! This crate provides:
//! - The `LearningPath` and `Skill` entities shared by the store and the coordinator
//! - Create and partial-update request types with input validation
//! - `DomainError`, the input-validation taxonomy

pub mod error;
pub mod learning_path;

pub use error::DomainError;
pub use learning_path::{
    CreateLearningPath, FieldValues, LearningPath, MAX_COMMUNITY_LEN, MAX_SKILL_NAME_LEN,
    MAX_TITLE_LEN, NewLearningPath, Skill, UpdateLearningPath, parse_learning_path_id,
};
