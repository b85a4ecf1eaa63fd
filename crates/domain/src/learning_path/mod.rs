//! Learning path entity and the requests that change it.

mod commands;
mod model;

pub use commands::{
    CreateLearningPath, FieldValues, MAX_COMMUNITY_LEN, MAX_SKILL_NAME_LEN, MAX_TITLE_LEN,
    UpdateLearningPath, parse_learning_path_id,
};
pub use model::{LearningPath, NewLearningPath, Skill};
