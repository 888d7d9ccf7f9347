//! Operator endpoints: monitoring, node administration and rebalancing.

mod common;

use axum::http::StatusCode;
use common::{body_json, create_job, get_auth, post_json, post_json_auth, register_node};
use serde_json::json;

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let app = common::build_test_app();
    let creator = app.token(2, "creator");

    let response = get_auth(&app.router, "/api/v1/admin/summary", &creator).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");

    let response = post_json_auth(
        &app.router,
        "/api/v1/admin/maintenance/rebalance-queued",
        json!({}),
        &creator,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn list_nodes_includes_derived_state() {
    let app = common::build_test_app();
    register_node(&app.router, "b", 95.0, 10.0).await;
    register_node(&app.router, "a", 50.0, 20.0).await;
    let admin = app.token(1, "admin");

    let json = body_json(get_auth(&app.router, "/api/v1/admin/nodes", &admin).await).await;
    let nodes = json["data"].as_array().unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0]["name"], "a");
    assert_eq!(nodes[0]["score"], 38.0);
    assert_eq!(nodes[0]["overloaded"], false);
    assert_eq!(nodes[1]["overloaded"], true);
    assert_eq!(nodes[1]["stale"], false);
}

#[tokio::test]
async fn deactivate_and_activate_node() {
    let app = common::build_test_app();
    register_node(&app.router, "w1", 10.0, 10.0).await;
    let admin = app.token(1, "admin");

    let json = body_json(
        post_json_auth(&app.router, "/api/v1/admin/nodes/w1/deactivate", json!({}), &admin).await,
    )
    .await;
    assert_eq!(json["data"]["is_active"], false);

    let json = body_json(
        post_json_auth(&app.router, "/api/v1/admin/nodes/w1/activate", json!({}), &admin).await,
    )
    .await;
    assert_eq!(json["data"]["is_active"], true);

    let response =
        post_json_auth(&app.router, "/api/v1/admin/nodes/ghost/activate", json!({}), &admin).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_jobs_is_newest_first_and_limited() {
    let app = common::build_test_app();
    let first = create_job(&app, "a").await;
    let second = create_job(&app, "b").await;
    let admin = app.token(1, "admin");

    let json = body_json(get_auth(&app.router, "/api/v1/admin/jobs", &admin).await).await;
    let ids: Vec<i64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![second, first]);

    let json = body_json(get_auth(&app.router, "/api/v1/admin/jobs?limit=1", &admin).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn job_locks_show_claim_history() {
    let app = common::build_test_app();
    register_node(&app.router, "w1", 10.0, 10.0).await;
    let job_id = create_job(&app, "encode").await;
    post_json(&app.router, "/api/v1/worker/next-job", json!({ "node_name": "w1" })).await;
    let admin = app.token(1, "admin");

    let json = body_json(
        get_auth(&app.router, &format!("/api/v1/admin/jobs/{job_id}/locks"), &admin).await,
    )
    .await;
    let locks = json["data"].as_array().unwrap();
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0]["job_id"], job_id);
}

#[tokio::test]
async fn summary_reports_jobs_and_nodes() {
    let app = common::build_test_app();
    register_node(&app.router, "a", 20.0, 20.0).await;
    register_node(&app.router, "b", 90.0, 10.0).await;
    create_job(&app, "encode").await;
    let admin = app.token(1, "admin");

    let json = body_json(get_auth(&app.router, "/api/v1/admin/summary", &admin).await).await;
    let data = &json["data"];
    assert_eq!(data["jobs"]["total"], 1);
    assert_eq!(data["jobs"]["by_status"]["queued"], 1);
    assert_eq!(data["nodes"]["count"], 2);
    assert_eq!(data["nodes"]["overloaded"], 1);
    assert_eq!(data["nodes"]["least_score"], 20.0);
    assert_eq!(data["nodes"]["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn rebalance_releases_pins_on_overloaded_nodes() {
    let app = common::build_test_app();
    register_node(&app.router, "hot", 10.0, 95.0).await;
    let admin = app.token(1, "admin");
    for _ in 0..3 {
        post_json_auth(
            &app.router,
            "/api/v1/jobs",
            json!({ "type": "encode", "preferred_node": "hot" }),
            &admin,
        )
        .await;
    }

    let json = body_json(
        post_json_auth(
            &app.router,
            "/api/v1/admin/maintenance/rebalance-queued",
            json!({}),
            &admin,
        )
        .await,
    )
    .await;
    assert_eq!(json["data"]["requeued"], 3);

    let json = body_json(
        post_json_auth(
            &app.router,
            "/api/v1/admin/maintenance/rebalance-queued",
            json!({}),
            &admin,
        )
        .await,
    )
    .await;
    assert_eq!(json["data"]["requeued"], 0);
}
