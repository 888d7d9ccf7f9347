#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use mediaq_api::auth::jwt::{issue_token, JwtConfig};
use mediaq_api::config::{ServerConfig, DEFAULT_MAX_BODY_BYTES};
use mediaq_api::router::build_app_router;
use mediaq_api::state::AppState;
use mediaq_core::clock::ManualClock;
use mediaq_db::MemoryStore;
use mediaq_scheduler::{Coordinator, SchedulerConfig};
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        jwt: JwtConfig::with_secret("test-secret-not-for-production"),
        scheduler: SchedulerConfig::default(),
    }
}

/// A running test application plus handles to steer it.
pub struct TestApp {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub config: ServerConfig,
}

impl TestApp {
    /// Mint a bearer token for `role`.
    pub fn token(&self, user_id: i64, role: &str) -> String {
        issue_token(user_id, role, Duration::minutes(15), &self.config.jwt).unwrap()
    }
}

/// Build the full application router over an in-memory store and a
/// manual clock, with the same middleware stack as production.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let coordinator = Coordinator::new(
        Arc::new(MemoryStore::new()),
        clock.clone(),
        config.scheduler,
    );
    let state = AppState {
        coordinator,
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        clock,
        config,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

fn json_request(
    method: Method,
    uri: &str,
    body: &serde_json::Value,
    token: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: &Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, json_request(Method::POST, uri, &body, None)).await
}

/// POST a raw body with a JSON content type, for malformed payloads.
pub async fn post_raw(app: &Router, uri: &str, body: impl Into<Body>) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, json_request(Method::POST, uri, &body, Some(token))).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Register a node and report its load.
pub async fn register_node(app: &Router, name: &str, cpu: f64, mem: f64) {
    let response = post_json(app, "/api/v1/nodes/register", serde_json::json!({ "name": name })).await;
    assert_eq!(response.status(), 200);
    let response = post_json(
        app,
        "/api/v1/nodes/heartbeat",
        serde_json::json!({ "name": name, "cpu_pct": cpu, "mem_pct": mem }),
    )
    .await;
    assert_eq!(response.status(), 200);
}

/// Queue a job as a creator and return its id.
pub async fn create_job(app: &TestApp, job_type: &str) -> i64 {
    let token = app.token(10, "creator");
    let response = post_json_auth(
        &app.router,
        "/api/v1/jobs",
        serde_json::json!({ "type": job_type, "payload": { "src": "in.mov" } }),
        &token,
    )
    .await;
    assert_eq!(response.status(), 201);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}
