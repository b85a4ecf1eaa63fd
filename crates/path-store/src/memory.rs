use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{LearningPathId, UserId};
use domain::{LearningPath, NewLearningPath, Skill};
use tokio::sync::RwLock;

use crate::{LearningPathStore, Result, StoreError};

#[derive(Default)]
struct State {
    paths: HashMap<LearningPathId, LearningPath>,
    /// Skill name to id; names are unique.
    skills: BTreeMap<String, i64>,
    next_skill_id: i64,
    links: HashSet<(LearningPathId, i64)>,
    favorites: HashMap<(UserId, LearningPathId), bool>,
}

impl State {
    fn title_taken(&self, title: &str, except: Option<LearningPathId>) -> bool {
        self.paths
            .values()
            .any(|p| !p.is_deleted() && p.title == title && Some(p.id) != except)
    }

    fn skills_of(&self, id: LearningPathId) -> Vec<Skill> {
        let mut skills: Vec<Skill> = self
            .skills
            .iter()
            .filter(|(_, skill_id)| self.links.contains(&(id, **skill_id)))
            .map(|(name, skill_id)| Skill {
                id: *skill_id,
                name: name.clone(),
            })
            .collect();
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        skills
    }

    fn hydrated(&self, path: &LearningPath) -> LearningPath {
        LearningPath {
            skills: Some(self.skills_of(path.id)),
            ..path.clone()
        }
    }

    fn live(&self, id: LearningPathId) -> Option<&LearningPath> {
        self.paths.get(&id).filter(|p| !p.is_deleted())
    }
}

#[derive(Default)]
struct Faults {
    create: AtomicBool,
    update: AtomicBool,
    restore: AtomicBool,
    hard_delete: AtomicBool,
    reload: AtomicBool,
}

/// In-memory learning path store for testing and local runs.
///
/// Mirrors the relational constraints of the Postgres schema and can be told
/// to fail individual operations, which is how saga compensation paths are
/// driven in tests.
#[derive(Clone, Default)]
pub struct InMemoryLearningPathStore {
    state: Arc<RwLock<State>>,
    faults: Arc<Faults>,
}

impl InMemoryLearningPathStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `create_with_skills` fail before writing anything.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.faults.create.store(fail, Ordering::SeqCst);
    }

    /// Makes `update_fields` fail before writing anything.
    pub fn set_fail_on_update(&self, fail: bool) {
        self.faults.update.store(fail, Ordering::SeqCst);
    }

    /// Makes `restore` fail.
    pub fn set_fail_on_restore(&self, fail: bool) {
        self.faults.restore.store(fail, Ordering::SeqCst);
    }

    /// Makes `hard_delete` fail.
    pub fn set_fail_on_hard_delete(&self, fail: bool) {
        self.faults.hard_delete.store(fail, Ordering::SeqCst);
    }

    /// Makes the post-write skill reload fail; the write itself still succeeds.
    pub fn set_fail_on_reload(&self, fail: bool) {
        self.faults.reload.store(fail, Ordering::SeqCst);
    }

    /// Number of rows, soft-deleted ones included.
    pub async fn path_count(&self) -> usize {
        self.state.read().await.paths.len()
    }

    pub async fn skill_count(&self) -> usize {
        self.state.read().await.skills.len()
    }

    pub async fn link_count(&self) -> usize {
        self.state.read().await.links.len()
    }

    fn check(flag: &AtomicBool, operation: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "injected failure on {operation}"
            )));
        }
        Ok(())
    }

    fn after_write(&self, state: &State, path: &LearningPath) -> LearningPath {
        if self.faults.reload.load(Ordering::SeqCst) {
            tracing::warn!(learning_path_id = %path.id, "skill reload failed after write");
            return path.clone();
        }
        state.hydrated(path)
    }
}

#[async_trait]
impl LearningPathStore for InMemoryLearningPathStore {
    async fn create_with_skills(
        &self,
        path: NewLearningPath,
        skill_names: &[String],
    ) -> Result<LearningPath> {
        Self::check(&self.faults.create, "create")?;

        let mut state = self.state.write().await;
        if state.paths.contains_key(&path.id) {
            return Err(StoreError::Unavailable(format!(
                "duplicate primary key {}",
                path.id
            )));
        }
        if state.title_taken(&path.title, None) {
            return Err(StoreError::DuplicateTitle(path.title));
        }

        let now = Utc::now();
        let created = LearningPath {
            id: path.id,
            title: path.title,
            description: path.description,
            is_public: path.is_public,
            thumbnail: path.thumbnail,
            community: path.community,
            diagram_id: path.diagram_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            skills: None,
        };

        for name in skill_names {
            let skill_id = match state.skills.get(name) {
                Some(id) => *id,
                None => {
                    state.next_skill_id += 1;
                    let id = state.next_skill_id;
                    state.skills.insert(name.clone(), id);
                    id
                }
            };
            state.links.insert((created.id, skill_id));
        }
        state.paths.insert(created.id, created.clone());

        Ok(self.after_write(&state, &created))
    }

    async fn update_fields(
        &self,
        id: LearningPathId,
        title: &str,
        description: &str,
    ) -> Result<LearningPath> {
        Self::check(&self.faults.update, "update")?;

        let mut state = self.state.write().await;
        if state.live(id).is_none() {
            return Err(StoreError::NotFound(id));
        }
        if state.title_taken(title, Some(id)) {
            return Err(StoreError::DuplicateTitle(title.to_string()));
        }

        let path = state.paths.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        path.title = title.to_string();
        path.description = description.to_string();
        path.updated_at = Utc::now();
        let updated = path.clone();

        Ok(self.after_write(&state, &updated))
    }

    async fn soft_delete(&self, id: LearningPathId) -> Result<()> {
        let mut state = self.state.write().await;
        match state.paths.get_mut(&id) {
            Some(path) if !path.is_deleted() => {
                path.deleted_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(StoreError::NotFound(id)),
        }
    }

    async fn restore(&self, id: LearningPathId) -> Result<()> {
        Self::check(&self.faults.restore, "restore")?;

        let mut state = self.state.write().await;
        let title = state
            .paths
            .get(&id)
            .map(|p| p.title.clone())
            .ok_or(StoreError::NotFound(id))?;
        if state.title_taken(&title, Some(id)) {
            return Err(StoreError::DuplicateTitle(title));
        }
        if let Some(path) = state.paths.get_mut(&id) {
            path.deleted_at = None;
        }
        Ok(())
    }

    async fn hard_delete(&self, id: LearningPathId) -> Result<()> {
        Self::check(&self.faults.hard_delete, "hard delete")?;

        let mut state = self.state.write().await;
        if state.paths.remove(&id).is_none() {
            return Err(StoreError::NotFound(id));
        }
        state.links.retain(|(path_id, _)| *path_id != id);
        state.favorites.retain(|(_, path_id), _| *path_id != id);
        Ok(())
    }

    async fn find(&self, id: LearningPathId) -> Result<Option<LearningPath>> {
        let state = self.state.read().await;
        Ok(state.live(id).map(|p| state.hydrated(p)))
    }

    async fn find_including_deleted(&self, id: LearningPathId) -> Result<Option<LearningPath>> {
        let state = self.state.read().await;
        Ok(state.paths.get(&id).map(|p| state.hydrated(p)))
    }

    async fn list(&self) -> Result<Vec<LearningPath>> {
        let state = self.state.read().await;
        let mut paths: Vec<LearningPath> = state
            .paths
            .values()
            .filter(|p| !p.is_deleted())
            .map(|p| state.hydrated(p))
            .collect();
        paths.sort_by(|a, b| (a.created_at, &a.title).cmp(&(b.created_at, &b.title)));
        Ok(paths)
    }

    async fn list_by_community(&self, community: &str) -> Result<Vec<LearningPath>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|p| p.community == community)
            .collect())
    }

    async fn add_favorite(&self, user: UserId, id: LearningPathId) -> Result<()> {
        let mut state = self.state.write().await;
        if state.live(id).is_none() {
            return Err(StoreError::NotFound(id));
        }
        state.favorites.insert((user, id), true);
        Ok(())
    }

    async fn remove_favorite(&self, user: UserId, id: LearningPathId) -> Result<()> {
        let mut state = self.state.write().await;
        if state.live(id).is_none() {
            return Err(StoreError::NotFound(id));
        }
        if let Some(flag) = state.favorites.get_mut(&(user, id)) {
            *flag = false;
        }
        Ok(())
    }

    async fn favorites(&self, user: UserId) -> Result<Vec<LearningPath>> {
        let state = self.state.read().await;
        let mut paths: Vec<LearningPath> = state
            .favorites
            .iter()
            .filter(|((owner, _), flag)| *owner == user && **flag)
            .filter_map(|((_, id), _)| state.live(*id))
            .map(|p| state.hydrated(p))
            .collect();
        paths.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(paths)
    }
}
