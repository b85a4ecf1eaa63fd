//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use path_store::{InMemoryLearningPathStore, LearningPathStore};
use saga::{InMemoryDiagramService, SagaCoordinator};
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: Router,
    store: InMemoryLearningPathStore,
    diagrams: InMemoryDiagramService,
}

fn setup() -> TestApp {
    let store = InMemoryLearningPathStore::new();
    let diagrams = InMemoryDiagramService::new();
    let coordinator = SagaCoordinator::new(store.clone(), diagrams.clone());
    let state = Arc::new(api::AppState::new(coordinator, Duration::from_secs(30)));
    TestApp {
        app: api::create_app(state, get_metrics_handle()),
        store,
        diagrams,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn create(&self, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/api/learning-paths")
                .header("content-type", "application/json")
                .header("authorization", "Bearer test-token")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn create_titled(&self, title: &str) -> String {
        let (status, json) = self
            .create(json!({
                "title": title,
                "description": "Intro",
                "community": "rust",
                "skills": ["Ownership", "Traits"]
            }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["id"].as_str().unwrap().to_string()
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn with_user(&self, method: &str, uri: &str, user: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("x-user-id", user)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}

#[tokio::test]
async fn test_health_check() {
    let t = setup();
    let (status, json) = t.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "learning-paths");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = setup();
    t.create_titled("Metrics Path").await;

    let response = t
        .app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("saga_executions_total"));
}

#[tokio::test]
async fn test_create_and_get_learning_path() {
    let t = setup();
    let (status, created) = t
        .create(json!({
            "title": "  Rust Basics  ",
            "description": "From zero",
            "is_public": true,
            "community": "rust",
            "skills": ["Ownership", "ownership ", "Traits"]
        }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], "Rust Basics");
    assert_eq!(created["is_public"], true);
    assert!(created["diagram_id"].as_str().is_some_and(|d| !d.is_empty()));

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = t.get(&format!("/api/learning-paths/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Rust Basics");
    assert_eq!(fetched["community"], "rust");
    assert_eq!(t.diagrams.diagram_count(), 1);
}

#[tokio::test]
async fn test_create_validation_error() {
    let t = setup();
    let (status, json) = t
        .create(json!({ "title": "   ", "community": "rust" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().is_some());
    assert_eq!(t.diagrams.create_calls(), 0);
}

#[tokio::test]
async fn test_create_duplicate_title_conflicts() {
    let t = setup();
    t.create_titled("Rust Basics").await;

    let (status, json) = t
        .create(json!({ "title": "Rust Basics", "community": "rust" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "A learning path with this name already exists");
    assert_eq!(t.store.path_count().await, 1);
}

#[tokio::test]
async fn test_create_without_token_is_bad_gateway() {
    let t = setup();
    let (status, json) = t
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/learning-paths")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "title": "Rust", "community": "rust" }).to_string(),
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .starts_with("operation failed, consistency preserved")
    );
    assert_eq!(t.store.path_count().await, 0);
}

#[tokio::test]
async fn test_insert_failure_reports_consistency_preserved() {
    let t = setup();
    t.store.set_fail_on_create(true);

    let (status, json) = t
        .create(json!({ "title": "Rust", "community": "rust" }))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"].as_str().unwrap().contains("diagram removed"));
    assert_eq!(t.diagrams.diagram_count(), 0);
}

#[tokio::test]
async fn test_double_failure_reports_reconciliation() {
    let t = setup();
    t.store.set_fail_on_create(true);
    t.diagrams.set_fail_on_delete(true);

    let (status, json) = t
        .create(json!({ "title": "Rust", "community": "rust" }))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "operation failed, reconciliation pending");
    assert_eq!(t.diagrams.diagram_count(), 1);
}

#[tokio::test]
async fn test_get_invalid_and_missing_ids() {
    let t = setup();

    let (status, _) = t.get("/api/learning-paths/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t
        .get("/api/learning-paths/00000000-0000-0000-0000-000000000000")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_learning_path() {
    let t = setup();
    let id = t.create_titled("Rust Basics").await;

    let (status, json) = t
        .send(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/learning-paths/{id}"))
                .header("content-type", "application/json")
                .header("authorization", "Bearer test-token")
                .body(Body::from(json!({ "title": "Rust Advanced" }).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Rust Advanced");
    assert_eq!(json["description"], "Intro");
    assert_eq!(t.diagrams.rename_calls(), 1);
}

#[tokio::test]
async fn test_empty_update_is_rejected() {
    let t = setup();
    let id = t.create_titled("Rust Basics").await;

    let (status, _) = t
        .send(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/learning-paths/{id}"))
                .header("content-type", "application/json")
                .header("authorization", "Bearer test-token")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(t.diagrams.rename_calls(), 0);
}

#[tokio::test]
async fn test_delete_learning_path() {
    let t = setup();
    let id = t.create_titled("Rust Basics").await;

    let (status, _) = t
        .send(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/learning-paths/{id}"))
                .header("authorization", "Bearer test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(t.diagrams.diagram_count(), 0);

    let (status, _) = t.get(&format!("/api/learning-paths/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_with_remote_failure_keeps_path() {
    let t = setup();
    let id = t.create_titled("Rust Basics").await;
    t.diagrams.set_fail_on_delete(true);

    let (status, _) = t
        .send(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/learning-paths/{id}"))
                .header("authorization", "Bearer test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, json) = t.get(&format!("/api/learning-paths/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Rust Basics");
}

#[tokio::test]
async fn test_list_and_community_filter() {
    let t = setup();
    t.create_titled("Rust Basics").await;
    let (status, _) = t
        .create(json!({ "title": "Go Basics", "community": "go" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, all) = t.get("/api/learning-paths").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, rust) = t.get("/api/communities/rust/learning-paths").await;
    assert_eq!(status, StatusCode::OK);
    let rust = rust.as_array().unwrap();
    assert_eq!(rust.len(), 1);
    assert_eq!(rust[0]["title"], "Rust Basics");
}

#[tokio::test]
async fn test_favorites_flow() {
    let t = setup();
    let id = t.create_titled("Rust Basics").await;
    let favorite = format!("/api/learning-paths/{id}/favorite");

    let (status, _) = t.with_user("POST", &favorite, "7").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = t.with_user("POST", &favorite, "7").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, favorites) = t
        .with_user("GET", "/api/learning-paths/favorites", "7")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(favorites.as_array().unwrap().len(), 1);
    assert_eq!(favorites[0]["id"], id.as_str());

    let (_, other) = t
        .with_user("GET", "/api/learning-paths/favorites", "8")
        .await;
    assert!(other.as_array().unwrap().is_empty());

    let (status, _) = t.with_user("DELETE", &favorite, "7").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, favorites) = t
        .with_user("GET", "/api/learning-paths/favorites", "7")
        .await;
    assert!(favorites.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_favorites_require_user() {
    let t = setup();
    let (status, _) = t.get("/api/learning-paths/favorites").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_favorite_missing_path_is_not_found() {
    let t = setup();
    let (status, _) = t
        .with_user(
            "POST",
            "/api/learning-paths/00000000-0000-0000-0000-000000000000/favorite",
            "7",
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(t.store.favorites(common::UserId::new(7)).await.unwrap().is_empty());
}
