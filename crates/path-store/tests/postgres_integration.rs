//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p path-store --test postgres_integration
//! ```

use std::sync::Arc;

use futures_util::future::join_all;
use path_store::{
    LearningPathId, LearningPathStore, PostgresLearningPathStore, StoreError, UserId,
};
use domain::NewLearningPath;
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_learning_paths.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresLearningPathStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE user_learning_paths, learning_path_skills, learning_paths, skills RESTART IDENTITY",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresLearningPathStore::new(pool)
}

fn new_path(title: &str) -> NewLearningPath {
    NewLearningPath {
        id: LearningPathId::new(),
        title: title.to_string(),
        description: "desc".to_string(),
        is_public: true,
        thumbnail: "thumb.png".to_string(),
        community: "backend".to_string(),
        diagram_id: "665f1c2e9b1e8a0012345678".to_string(),
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

async fn count(store: &PostgresLearningPathStore, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(store.pool())
        .await
        .unwrap()
}

#[tokio::test]
#[serial]
async fn test_create_with_skills_reuses_existing_skills() {
    let store = get_test_store().await;

    let first = store
        .create_with_skills(new_path("Go Basics"), &names(&["Go", "Docker"]))
        .await
        .unwrap();
    assert_eq!(first.skill_names(), vec!["Docker", "Go"]);
    assert_eq!(first.diagram_id, "665f1c2e9b1e8a0012345678");

    store
        .create_with_skills(new_path("Go Advanced"), &names(&["Go"]))
        .await
        .unwrap();

    assert_eq!(count(&store, "skills").await, 2);
    assert_eq!(count(&store, "learning_path_skills").await, 3);
}

#[tokio::test]
#[serial]
async fn test_duplicate_title_rolls_back_whole_transaction() {
    let store = get_test_store().await;
    store
        .create_with_skills(new_path("Rust"), &[])
        .await
        .unwrap();

    let err = store
        .create_with_skills(new_path("Rust"), &names(&["Tokio"]))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::DuplicateTitle(ref t) if t == "Rust"));
    assert_eq!(count(&store, "learning_paths").await, 1);
    assert_eq!(count(&store, "skills").await, 0);
}

#[tokio::test]
#[serial]
async fn test_update_fields_and_conflicts() {
    let store = get_test_store().await;
    store
        .create_with_skills(new_path("Rust"), &[])
        .await
        .unwrap();
    let go = store
        .create_with_skills(new_path("Go"), &names(&["Go"]))
        .await
        .unwrap();

    let updated = store
        .update_fields(go.id, "Go 1.22", "generics")
        .await
        .unwrap();
    assert_eq!(updated.title, "Go 1.22");
    assert_eq!(updated.description, "generics");
    assert_eq!(updated.skill_names(), vec!["Go"]);

    let err = store.update_fields(go.id, "Rust", "").await.unwrap_err();
    assert!(err.is_conflict());

    let err = store
        .update_fields(LearningPathId::new(), "x", "y")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
#[serial]
async fn test_soft_delete_restore_and_title_reuse() {
    let store = get_test_store().await;
    let original = store
        .create_with_skills(new_path("Rust"), &[])
        .await
        .unwrap();

    store.soft_delete(original.id).await.unwrap();
    assert!(store.find(original.id).await.unwrap().is_none());
    assert!(
        store
            .find_including_deleted(original.id)
            .await
            .unwrap()
            .unwrap()
            .is_deleted()
    );
    assert!(store.soft_delete(original.id).await.unwrap_err().is_not_found());

    store.restore(original.id).await.unwrap();
    assert!(store.find(original.id).await.unwrap().is_some());

    // A soft-deleted title can be taken, after which restore conflicts.
    store.soft_delete(original.id).await.unwrap();
    store
        .create_with_skills(new_path("Rust"), &[])
        .await
        .unwrap();
    let err = store.restore(original.id).await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
#[serial]
async fn test_hard_delete_cascades_but_keeps_skills() {
    let store = get_test_store().await;
    let user = UserId::new(42);
    let path = store
        .create_with_skills(new_path("Rust"), &names(&["Cargo", "Tokio"]))
        .await
        .unwrap();
    store.add_favorite(user, path.id).await.unwrap();

    store.hard_delete(path.id).await.unwrap();

    assert_eq!(count(&store, "learning_paths").await, 0);
    assert_eq!(count(&store, "learning_path_skills").await, 0);
    assert_eq!(count(&store, "user_learning_paths").await, 0);
    assert_eq!(count(&store, "skills").await, 2);
    assert!(store.hard_delete(path.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
#[serial]
async fn test_favorites() {
    let store = get_test_store().await;
    let user = UserId::new(1);
    let a = store
        .create_with_skills(new_path("B path"), &[])
        .await
        .unwrap();
    let b = store
        .create_with_skills(new_path("A path"), &names(&["Go"]))
        .await
        .unwrap();

    store.add_favorite(user, a.id).await.unwrap();
    store.add_favorite(user, a.id).await.unwrap();
    store.add_favorite(user, b.id).await.unwrap();

    let favorites = store.favorites(user).await.unwrap();
    let titles: Vec<&str> = favorites.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["A path", "B path"]);
    assert_eq!(favorites[0].skill_names(), vec!["Go"]);

    store.remove_favorite(user, b.id).await.unwrap();
    assert_eq!(store.favorites(user).await.unwrap().len(), 1);

    store.soft_delete(a.id).await.unwrap();
    assert!(store.favorites(user).await.unwrap().is_empty());
    assert!(store.add_favorite(user, a.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
#[serial]
async fn test_concurrent_creates_with_same_title_admit_one() {
    let store = get_test_store().await;

    let attempts = (0..8).map(|_| {
        let store = store.clone();
        async move {
            store
                .create_with_skills(new_path("Race"), &names(&["Shared"]))
                .await
        }
    });
    let results = join_all(attempts).await;

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.is_conflict()))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(count(&store, "learning_paths").await, 1);
}

#[tokio::test]
#[serial]
async fn test_concurrent_creates_sharing_skills_in_opposite_order_all_succeed() {
    let store = get_test_store().await;
    let shared: Vec<String> = (0..40).map(|i| format!("skill-{i:02}")).collect();

    for round in 0..5 {
        let attempts = (0..6).map(|i| {
            let store = store.clone();
            let mut skills = shared.clone();
            if i % 2 == 1 {
                skills.reverse();
            }
            async move {
                store
                    .create_with_skills(new_path(&format!("Path {round}-{i}")), &skills)
                    .await
            }
        });
        let results = join_all(attempts).await;

        for result in &results {
            assert!(result.is_ok(), "create failed: {result:?}");
        }
    }

    assert_eq!(count(&store, "learning_paths").await, 30);
    assert_eq!(count(&store, "skills").await, 40);
    assert_eq!(count(&store, "learning_path_skills").await, 30 * 40);
}
