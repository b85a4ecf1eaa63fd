use async_trait::async_trait;
use common::{LearningPathId, UserId};
use domain::{LearningPath, NewLearningPath};

use crate::Result;

/// Relational store for learning paths.
///
/// The write operations are the relational half of the learning path sagas:
/// each one is a single transaction, so a failure never leaves a partial
/// skill set or a half-updated row behind. All implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait LearningPathStore: Send + Sync {
    /// Inserts the row, then for each skill name looks up the skill, creates it
    /// if absent, and links it to the row, all in one transaction.
    ///
    /// A title already used by a live row fails with `DuplicateTitle`.
    /// The returned entity's skills are hydrated on a best-effort basis.
    async fn create_with_skills(
        &self,
        path: NewLearningPath,
        skill_names: &[String],
    ) -> Result<LearningPath>;

    /// Overwrites title and description of a live row.
    ///
    /// Returns `NotFound` for missing or soft-deleted rows.
    async fn update_fields(
        &self,
        id: LearningPathId,
        title: &str,
        description: &str,
    ) -> Result<LearningPath>;

    /// Marks a live row as deleted without removing it.
    async fn soft_delete(&self, id: LearningPathId) -> Result<()>;

    /// Clears the deletion marker of a row.
    async fn restore(&self, id: LearningPathId) -> Result<()>;

    /// Permanently removes a row together with its skill links and favorites.
    ///
    /// Skills themselves are never removed.
    async fn hard_delete(&self, id: LearningPathId) -> Result<()>;

    /// Loads a live row with its skills.
    async fn find(&self, id: LearningPathId) -> Result<Option<LearningPath>>;

    /// Loads a row regardless of its deletion marker.
    async fn find_including_deleted(&self, id: LearningPathId) -> Result<Option<LearningPath>>;

    /// Lists all live rows.
    async fn list(&self) -> Result<Vec<LearningPath>>;

    /// Lists live rows tagged with the given community.
    async fn list_by_community(&self, community: &str) -> Result<Vec<LearningPath>>;

    /// Flags a live learning path as a favorite of the user. Idempotent.
    async fn add_favorite(&self, user: UserId, id: LearningPathId) -> Result<()>;

    /// Clears the favorite flag. Idempotent.
    async fn remove_favorite(&self, user: UserId, id: LearningPathId) -> Result<()>;

    /// Lists the user's live favorite learning paths.
    async fn favorites(&self, user: UserId) -> Result<Vec<LearningPath>>;
}
