//! Job submission and lookup.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, get_auth, post_json, post_json_auth, register_node};
use serde_json::json;

#[tokio::test]
async fn create_job_requires_token() {
    let app = common::build_test_app();
    let response = post_json(&app.router, "/api/v1/jobs", json!({ "type": "encode" })).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn viewer_cannot_create_jobs() {
    let app = common::build_test_app();
    let token = app.token(3, "viewer");
    let response =
        post_json_auth(&app.router, "/api/v1/jobs", json!({ "type": "encode" }), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn creator_queues_job_and_viewer_reads_it() {
    let app = common::build_test_app();
    let creator = app.token(5, "creator");
    let response = post_json_auth(
        &app.router,
        "/api/v1/jobs",
        json!({ "type": "encode", "payload": { "preset": "prores" } }),
        &creator,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["data"]["status"], "queued");
    assert_eq!(created["data"]["submitted_by"], 5);
    assert_eq!(created["data"]["progress"], 0.0);

    let id = created["data"]["id"].as_i64().unwrap();
    let viewer = app.token(6, "viewer");
    let fetched = body_json(get_auth(&app.router, &format!("/api/v1/jobs/{id}"), &viewer).await).await;
    assert_eq!(fetched["data"]["type"], "encode");
    assert_eq!(fetched["data"]["payload"]["preset"], "prores");
}

#[tokio::test]
async fn get_job_requires_token() {
    let app = common::build_test_app();
    let response = get(&app.router, "/api/v1/jobs/1").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_token_is_rejected() {
    let app = common::build_test_app();
    let response = get_auth(&app.router, "/api/v1/jobs/1", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid or expired token");
}

#[tokio::test]
async fn missing_job_is_404() {
    let app = common::build_test_app();
    let token = app.token(1, "admin");
    let response = get_auth(&app.router, "/api/v1/jobs/77", &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn preferred_node_pins_job() {
    let app = common::build_test_app();
    register_node(&app.router, "gpu-01", 10.0, 10.0).await;
    let token = app.token(1, "admin");

    let json = body_json(
        post_json_auth(
            &app.router,
            "/api/v1/jobs",
            json!({ "type": "encode", "preferred_node": "gpu-01" }),
            &token,
        )
        .await,
    )
    .await;
    assert!(json["data"]["assigned_node_id"].is_number());

    let response = post_json_auth(
        &app.router,
        "/api/v1/jobs",
        json!({ "type": "encode", "preferred_node": "nowhere" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
