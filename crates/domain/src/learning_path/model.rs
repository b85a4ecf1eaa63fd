//! Learning path entities as stored in the relational store.

use chrono::{DateTime, Utc};
use common::LearningPathId;
use serde::{Deserialize, Serialize};

/// A skill shared between learning paths.
///
/// Skills are created lazily on first reference and never deleted by the
/// coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Skill {
    pub id: i64,
    pub name: String,
}

/// A learning path row, optionally hydrated with its skills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPath {
    pub id: LearningPathId,
    pub title: String,
    pub description: String,
    pub is_public: bool,
    pub thumbnail: String,
    pub community: String,
    /// Identifier of the diagram record in the document store.
    pub diagram_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set while the row is soft-deleted.
    pub deleted_at: Option<DateTime<Utc>>,
    /// `None` when the skill list could not be reloaded after a write.
    pub skills: Option<Vec<Skill>>,
}

impl LearningPath {
    /// Returns true if the row carries a deletion marker.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns the names of the hydrated skills, or an empty list.
    pub fn skill_names(&self) -> Vec<&str> {
        self.skills
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|s| s.name.as_str())
            .collect()
    }
}

/// A learning path row ready to be inserted.
///
/// The identifier is minted by the coordinator and the diagram id comes from
/// the diagram service, so both are known before the insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLearningPath {
    pub id: LearningPathId,
    pub title: String,
    pub description: String,
    pub is_public: bool,
    pub thumbnail: String,
    pub community: String,
    pub diagram_id: String,
}
