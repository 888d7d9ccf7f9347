use std::sync::Arc;

use chrono::{Duration, Utc};
use mediaq_core::clock::ManualClock;
use mediaq_core::status::JobStatus;
use mediaq_db::models::job::CreateJob;
use mediaq_db::models::node::{Heartbeat, RegisterNode};
use mediaq_db::MemoryStore;
use mediaq_scheduler::{Coordinator, SchedulerConfig};
use serde_json::json;

fn setup() -> (Coordinator, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let coordinator = Coordinator::new(
        Arc::new(MemoryStore::new()),
        clock.clone(),
        SchedulerConfig::default(),
    );
    (coordinator, clock)
}

async fn node(c: &Coordinator, name: &str, cpu: Option<f64>, mem: Option<f64>) {
    c.register(&RegisterNode {
        name: name.into(),
        address: None,
    })
    .await
    .unwrap();
    c.record_heartbeat(&Heartbeat {
        name: name.into(),
        cpu_pct: cpu,
        mem_pct: mem,
        ..Default::default()
    })
    .await
    .unwrap();
}

async fn pinned_job(c: &Coordinator, node: &str) -> i64 {
    c.create_job(
        &CreateJob {
            job_type: "thumbnail".into(),
            payload: json!({}),
            preferred_node: Some(node.into()),
        },
        None,
    )
    .await
    .unwrap()
    .id
}

async fn unpinned_job(c: &Coordinator) -> i64 {
    c.create_job(
        &CreateJob {
            job_type: "thumbnail".into(),
            payload: json!({}),
            preferred_node: None,
        },
        None,
    )
    .await
    .unwrap()
    .id
}

#[tokio::test]
async fn rebalance_releases_jobs_pinned_to_overloaded_nodes() {
    let (c, _) = setup();
    node(&c, "hot", None, None).await;
    let hot_id = c.get_node("hot").await.unwrap().id;
    let running = pinned_job(&c, "hot").await;
    let claimed = c.claim_next("hot").await.unwrap();
    assert_eq!(claimed.job().map(|j| j.id), Some(running));

    node(&c, "hot", Some(95.0), Some(10.0)).await;
    node(&c, "cool", Some(10.0), Some(10.0)).await;
    let a = pinned_job(&c, "hot").await;
    let b = pinned_job(&c, "hot").await;
    let keep = pinned_job(&c, "cool").await;
    let free = unpinned_job(&c).await;

    assert_eq!(c.rebalance_queued().await.unwrap(), 2);
    assert_eq!(c.get_job(a).await.unwrap().assigned_node_id, None);
    assert_eq!(c.get_job(b).await.unwrap().assigned_node_id, None);
    assert!(c.get_job(keep).await.unwrap().assigned_node_id.is_some());

    let free = c.get_job(free).await.unwrap();
    assert_eq!(free.assigned_node_id, None);
    assert_eq!(free.status, JobStatus::Queued);

    let running = c.get_job(running).await.unwrap();
    assert_eq!(running.status, JobStatus::Running);
    assert_eq!(running.assigned_node_id, Some(hot_id));

    assert_eq!(c.rebalance_queued().await.unwrap(), 0);
}

#[tokio::test]
async fn rebalance_ignores_deactivated_nodes() {
    let (c, _) = setup();
    node(&c, "hot", Some(99.0), None).await;
    pinned_job(&c, "hot").await;
    c.set_active("hot", false).await.unwrap();

    assert_eq!(c.rebalance_queued().await.unwrap(), 0);
}

#[tokio::test]
async fn rebalance_with_no_overload_is_zero() {
    let (c, _) = setup();
    node(&c, "a", None, None).await;
    pinned_job(&c, "a").await;
    assert_eq!(c.rebalance_queued().await.unwrap(), 0);
}

#[tokio::test]
async fn summary_covers_active_nodes_only() {
    let (c, clock) = setup();
    node(&c, "a", Some(20.0), Some(20.0)).await;
    node(&c, "b", Some(90.0), Some(10.0)).await;
    node(&c, "off", Some(1.0), Some(1.0)).await;
    c.set_active("off", false).await.unwrap();
    pinned_job(&c, "a").await;
    clock.advance(Duration::seconds(60));

    let summary = c.summary().await.unwrap();
    assert_eq!(summary.jobs.total, 1);
    assert_eq!(summary.jobs.by_status.queued, 1);
    assert_eq!(summary.nodes.count, 2);
    assert_eq!(summary.nodes.overloaded, 1);
    assert!((summary.nodes.least_score.unwrap() - 20.0).abs() < 1e-9);
    assert!(summary.nodes.items.iter().all(|n| n.stale));

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["jobs"]["by_status"]["queued"], 1);
    assert_eq!(json["nodes"]["items"][0]["name"], "a");
}

#[tokio::test]
async fn summary_without_active_nodes_has_no_least_score() {
    let (c, _) = setup();
    let summary = c.summary().await.unwrap();
    assert_eq!(summary.nodes.count, 0);
    assert_eq!(summary.nodes.least_score, None);
}

#[tokio::test]
async fn list_nodes_reports_derived_state() {
    let (c, _) = setup();
    node(&c, "b", Some(50.0), Some(20.0)).await;
    node(&c, "a", None, Some(85.0)).await;

    let nodes = c.list_nodes().await.unwrap();
    let names: Vec<&str> = nodes.iter().map(|n| n.node.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert!(nodes[0].overloaded);
    assert!((nodes[1].score - 38.0).abs() < 1e-9);
    assert!(!nodes[1].stale);
}

#[tokio::test]
async fn list_jobs_clamps_limit() {
    let (c, _) = setup();
    node(&c, "a", None, None).await;
    for _ in 0..3 {
        pinned_job(&c, "a").await;
    }
    assert_eq!(c.list_jobs(Some(0)).await.unwrap().len(), 1);
    assert_eq!(c.list_jobs(None).await.unwrap().len(), 3);
}
