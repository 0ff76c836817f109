use std::sync::Arc;

use afl_api::{ApiState, ProgressBackend, config::Environment, middleware, router};
use afl_progress::{FixedClock, ProgressKey, ProgressRepository};
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode},
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde::Deserialize;
use sqlx::PgPool;
use tower::ServiceExt;

/// First day of every test scenario.
pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date")
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(start_date()))
}

/// App over an in-memory backend driven by `clock`.
pub fn memory_app(clock: Arc<FixedClock>) -> TestClient {
    TestClient::from_state(ApiState::in_memory(clock))
}

/// App over `repository`, labelled `label` in metrics.
pub fn app_with_repository(
    repository: impl ProgressRepository + 'static,
    clock: Arc<FixedClock>,
    label: &'static str,
) -> TestClient {
    let backend = ProgressBackend::local(repository, clock, label);
    TestClient::from_state(ApiState::with_backend(backend, Environment::Development))
}

/// App over a migrated Postgres database, or `None` when `TEST_DATABASE_URL` is unset.
///
/// The pool is returned too so tests can read rows directly.
pub async fn postgres_app(clock: Arc<FixedClock>) -> Option<(TestClient, PgPool)> {
    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping postgres test");
        return None;
    };

    let pool = afl_db::create_pool(&database_url, 10)
        .await
        .expect("Failed to connect to test database");
    afl_db::ensure_db_and_migrate(&database_url, &pool)
        .await
        .expect("Failed to migrate test database");

    let backend = ProgressBackend::postgres(pool.clone(), clock);
    let state = ApiState::with_backend(backend, Environment::Development);
    Some((TestClient::from_state(state), pool))
}

/// Key for a learner no other test run has used, and its route base.
pub fn fresh_key(language_id: &str) -> (ProgressKey, String) {
    let key = ProgressKey::new(uuid::Uuid::new_v4().to_string(), language_id);
    let base = format!("/progress/{}/{}", key.learner_id, key.language_id);
    (key, base)
}

/// Helper to make requests to the test app
pub struct TestClient {
    router: Router,
}

impl TestClient {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    pub fn from_state(state: ApiState) -> Self {
        let router = router::router()
            .with_state(state)
            .layer(axum::middleware::from_fn(middleware::request_id_middleware));
        Self::new(router)
    }

    /// Send a request and get the response
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        TestResponse {
            status,
            body: body_bytes.to_vec(),
            headers,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");

        self.request(request).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");

        self.request(request).await
    }

    /// Send a POST request with JSON body
    pub async fn post_json<T: serde::Serialize>(&self, uri: &str, body: &T) -> TestResponse {
        let json_body = serde_json::to_string(body).expect("Failed to serialize body");

        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json_body))
            .expect("Failed to build request");

        self.request(request).await
    }

    /// Record one review and return the response body.
    pub async fn review(&self, base: &str, card_id: &str, correct: bool) -> serde_json::Value {
        let response = self
            .post_json(
                &format!("{base}/reviews"),
                &serde_json::json!({ "cardId": card_id, "correct": correct }),
            )
            .await;
        response.assert_status(StatusCode::OK);
        response.json()
    }
}

/// Test response wrapper
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
    pub headers: HeaderMap,
}

impl TestResponse {
    /// Get response body as string
    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("Response body is not valid UTF-8")
    }

    /// Parse response body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }

    pub fn assert_status(&self, expected: StatusCode) {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
    }
}
