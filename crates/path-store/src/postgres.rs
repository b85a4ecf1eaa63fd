use std::collections::HashMap;

use async_trait::async_trait;
use common::{LearningPathId, UserId};
use domain::{LearningPath, NewLearningPath, Skill};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::{LearningPathStore, Result, StoreError};

/// Name of the partial unique index enforcing title uniqueness among live rows.
const TITLE_CONSTRAINT: &str = "learning_paths_title_active_key";

const PATH_COLUMNS: &str = "id, title, description, is_public, thumbnail, community, diagram_id, created_at, updated_at, deleted_at";

/// PostgreSQL-backed learning path store.
#[derive(Clone)]
pub struct PostgresLearningPathStore {
    pool: PgPool,
}

impl PostgresLearningPathStore {
    /// Creates a new store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool to the given database URL.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_path(row: &PgRow) -> Result<LearningPath> {
        Ok(LearningPath {
            id: LearningPathId::from_uuid(row.try_get::<Uuid, _>("id")?),
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            is_public: row.try_get("is_public")?,
            thumbnail: row.try_get("thumbnail")?,
            community: row.try_get("community")?,
            diagram_id: row.try_get("diagram_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
            skills: None,
        })
    }

    /// Loads the skills of the given paths in one round-trip.
    async fn load_skills(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Skill>>> {
        let mut by_path: HashMap<Uuid, Vec<Skill>> = HashMap::new();
        if ids.is_empty() {
            return Ok(by_path);
        }

        let rows = sqlx::query(
            r#"
            SELECT lps.learning_path_id, s.id, s.name
            FROM learning_path_skills lps
            JOIN skills s ON s.id = lps.skill_id
            WHERE lps.learning_path_id = ANY($1)
            ORDER BY s.name ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        for row in rows {
            let path_id: Uuid = row.try_get("learning_path_id")?;
            by_path.entry(path_id).or_default().push(Skill {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
            });
        }
        Ok(by_path)
    }

    async fn hydrate_all(&self, rows: Vec<PgRow>) -> Result<Vec<LearningPath>> {
        let mut paths = rows
            .iter()
            .map(Self::row_to_path)
            .collect::<Result<Vec<_>>>()?;
        let ids: Vec<Uuid> = paths.iter().map(|p| p.id.as_uuid()).collect();
        let mut skills = self.load_skills(&ids).await?;
        for path in &mut paths {
            path.skills = Some(skills.remove(&path.id.as_uuid()).unwrap_or_default());
        }
        Ok(paths)
    }

    /// Attaches skills to a freshly written row.
    ///
    /// The write has already committed, so a failed reload returns the row
    /// without its skill list instead of failing the operation.
    async fn hydrate_after_write(&self, mut path: LearningPath) -> LearningPath {
        match self.load_skills(&[path.id.as_uuid()]).await {
            Ok(mut skills) => {
                path.skills = Some(skills.remove(&path.id.as_uuid()).unwrap_or_default());
            }
            Err(e) => {
                tracing::warn!(learning_path_id = %path.id, error = %e, "skill reload failed after write");
            }
        }
        path
    }

    /// Inserts the skill if missing and returns its id. Existing rows are
    /// read back rather than updated so they are never row-locked.
    async fn upsert_skill(tx: &mut Transaction<'_, Postgres>, name: &str) -> Result<i64> {
        sqlx::query("INSERT INTO skills (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&mut **tx)
            .await?;
        let id: i64 = sqlx::query_scalar("SELECT id FROM skills WHERE name = $1")
            .bind(name)
            .fetch_one(&mut **tx)
            .await?;
        Ok(id)
    }

    async fn live_path_exists(&self, id: LearningPathId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM learning_paths WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

/// Maps a write error, recognizing the title uniqueness index.
fn map_write_error(err: sqlx::Error, title: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.constraint() == Some(TITLE_CONSTRAINT)
    {
        return StoreError::DuplicateTitle(title.to_string());
    }
    StoreError::Database(err)
}

#[async_trait]
impl LearningPathStore for PostgresLearningPathStore {
    async fn create_with_skills(
        &self,
        path: NewLearningPath,
        skill_names: &[String],
    ) -> Result<LearningPath> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO learning_paths (id, title, description, is_public, thumbnail, community, diagram_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PATH_COLUMNS}
            "#
        ))
        .bind(path.id.as_uuid())
        .bind(&path.title)
        .bind(&path.description)
        .bind(path.is_public)
        .bind(&path.thumbnail)
        .bind(&path.community)
        .bind(&path.diagram_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, &path.title))?;
        let created = Self::row_to_path(&row)?;

        // Concurrent creates sharing skills must take the index locks in the
        // same order.
        let mut ordered: Vec<&str> = skill_names.iter().map(String::as_str).collect();
        ordered.sort_unstable();
        ordered.dedup();

        for name in ordered {
            let skill_id = Self::upsert_skill(&mut tx, name).await?;
            sqlx::query(
                r#"
                INSERT INTO learning_path_skills (learning_path_id, skill_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(path.id.as_uuid())
            .bind(skill_id)
            .execute(&mut *tx)
            .await?;
        }

        // Dropping the transaction on any error above rolls everything back.
        tx.commit().await?;
        metrics::counter!("path_store_writes_total", "operation" => "create").increment(1);

        Ok(self.hydrate_after_write(created).await)
    }

    async fn update_fields(
        &self,
        id: LearningPathId,
        title: &str,
        description: &str,
    ) -> Result<LearningPath> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE learning_paths
            SET title = $2, description = $3, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {PATH_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(title)
        .bind(description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, title))?
        .ok_or(StoreError::NotFound(id))?;
        metrics::counter!("path_store_writes_total", "operation" => "update").increment(1);

        let updated = Self::row_to_path(&row)?;
        Ok(self.hydrate_after_write(updated).await)
    }

    async fn soft_delete(&self, id: LearningPathId) -> Result<()> {
        let result = sqlx::query(
            "UPDATE learning_paths SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        metrics::counter!("path_store_writes_total", "operation" => "soft_delete").increment(1);
        Ok(())
    }

    async fn restore(&self, id: LearningPathId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let title: Option<String> =
            sqlx::query_scalar("SELECT title FROM learning_paths WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        let title = title.ok_or(StoreError::NotFound(id))?;

        sqlx::query("UPDATE learning_paths SET deleted_at = NULL WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_write_error(e, &title))?;

        tx.commit().await?;
        metrics::counter!("path_store_writes_total", "operation" => "restore").increment(1);
        Ok(())
    }

    async fn hard_delete(&self, id: LearningPathId) -> Result<()> {
        // Join rows and favorites go with the row via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM learning_paths WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        metrics::counter!("path_store_writes_total", "operation" => "hard_delete").increment(1);
        Ok(())
    }

    async fn find(&self, id: LearningPathId) -> Result<Option<LearningPath>> {
        let row = sqlx::query(&format!(
            "SELECT {PATH_COLUMNS} FROM learning_paths WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate_all(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_including_deleted(&self, id: LearningPathId) -> Result<Option<LearningPath>> {
        let row = sqlx::query(&format!(
            "SELECT {PATH_COLUMNS} FROM learning_paths WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate_all(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<LearningPath>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PATH_COLUMNS} FROM learning_paths
            WHERE deleted_at IS NULL
            ORDER BY created_at ASC, title ASC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_all(rows).await
    }

    async fn list_by_community(&self, community: &str) -> Result<Vec<LearningPath>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PATH_COLUMNS} FROM learning_paths
            WHERE community = $1 AND deleted_at IS NULL
            ORDER BY created_at ASC, title ASC
            "#
        ))
        .bind(community)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_all(rows).await
    }

    async fn add_favorite(&self, user: UserId, id: LearningPathId) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_learning_paths (user_id, learning_path_id, is_favorite)
            SELECT $1, id, TRUE FROM learning_paths WHERE id = $2 AND deleted_at IS NULL
            ON CONFLICT (user_id, learning_path_id)
            DO UPDATE SET is_favorite = TRUE, updated_at = NOW()
            "#,
        )
        .bind(user.as_i64())
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn remove_favorite(&self, user: UserId, id: LearningPathId) -> Result<()> {
        if !self.live_path_exists(id).await? {
            return Err(StoreError::NotFound(id));
        }

        sqlx::query(
            r#"
            UPDATE user_learning_paths
            SET is_favorite = FALSE, updated_at = NOW()
            WHERE user_id = $1 AND learning_path_id = $2
            "#,
        )
        .bind(user.as_i64())
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn favorites(&self, user: UserId) -> Result<Vec<LearningPath>> {
        let rows = sqlx::query(
            r#"
            SELECT lp.id, lp.title, lp.description, lp.is_public, lp.thumbnail, lp.community,
                   lp.diagram_id, lp.created_at, lp.updated_at, lp.deleted_at
            FROM learning_paths lp
            JOIN user_learning_paths ulp ON ulp.learning_path_id = lp.id
            WHERE ulp.user_id = $1 AND ulp.is_favorite AND lp.deleted_at IS NULL
            ORDER BY lp.title ASC
            "#,
        )
        .bind(user.as_i64())
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_all(rows).await
    }
}
