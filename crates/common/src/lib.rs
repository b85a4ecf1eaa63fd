//! Shared identifiers used across the learning-path crates.

pub mod types;

pub use types::{Credential, LearningPathId, UserId};
