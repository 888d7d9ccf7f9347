//! Runs the agent against a real coordinator router bound to a local port,
//! backed by the in-memory store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use mediaq_agent::client::{AssignedJob, ClientError, CoordinatorClient};
use mediaq_agent::collector::MetricsCollector;
use mediaq_agent::config::AgentConfig;
use mediaq_agent::executor::{ExecutionError, JobExecutor, ProgressSink};
use mediaq_agent::runner::{Agent, PollOutcome};
use mediaq_api::auth::jwt::JwtConfig;
use mediaq_api::config::{ServerConfig, DEFAULT_MAX_BODY_BYTES};
use mediaq_api::router::build_app_router;
use mediaq_api::state::AppState;
use mediaq_core::clock::SystemClock;
use mediaq_core::status::JobStatus;
use mediaq_db::models::job::CreateJob;
use mediaq_db::MemoryStore;
use mediaq_scheduler::{Coordinator, SchedulerConfig};
use serde_json::json;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Start a coordinator on `127.0.0.1:<random>` and return its base URL
/// plus a handle for seeding jobs.
async fn spawn_coordinator() -> (String, Coordinator) {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        jwt: JwtConfig::with_secret("test-secret-not-for-production"),
        scheduler: SchedulerConfig::default(),
    };
    let coordinator = Coordinator::new(
        Arc::new(MemoryStore::new()),
        Arc::new(SystemClock),
        config.scheduler,
    );
    let state = AppState {
        coordinator: coordinator.clone(),
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), coordinator)
}

fn agent_config(url: &str, name: &str) -> AgentConfig {
    AgentConfig {
        coordinator_url: url.to_string(),
        node_name: name.to_string(),
        node_address: None,
        heartbeat_interval: Duration::from_millis(200),
        poll_interval: Duration::from_millis(50),
        job_command: "unused".to_string(),
        job_timeout: Duration::from_secs(5),
    }
}

/// No metrics, so the node never looks busy whatever the test host is doing.
fn quiet_collector() -> MetricsCollector {
    MetricsCollector::disabled()
}

async fn queue(coordinator: &Coordinator, job_type: &str) -> i64 {
    coordinator
        .create_job(
            &CreateJob {
                job_type: job_type.to_string(),
                payload: json!({"src": "clip.mov"}),
                preferred_node: None,
            },
            None,
        )
        .await
        .unwrap()
        .id
}

/// Records the jobs it sees, reports 50% and fails jobs of type `broken`.
#[derive(Default)]
struct ScriptedExecutor {
    seen: Mutex<Vec<AssignedJob>>,
}

#[async_trait]
impl JobExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        job: &AssignedJob,
        progress: &dyn ProgressSink,
    ) -> Result<(), ExecutionError> {
        self.seen.lock().unwrap().push(job.clone());
        progress.report(50.0).await;
        if job.job_type == "broken" {
            return Err(ExecutionError::Other("decoder crashed".into()));
        }
        Ok(())
    }
}

/// Never finishes on its own.
struct Hang;

#[async_trait]
impl JobExecutor for Hang {
    async fn execute(
        &self,
        _job: &AssignedJob,
        _progress: &dyn ProgressSink,
    ) -> Result<(), ExecutionError> {
        std::future::pending().await
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_node_claim_is_node_not_registered() {
    let (url, _) = spawn_coordinator().await;
    let client = CoordinatorClient::new(&url).unwrap();

    let err = client.next_job("ghost").await.unwrap_err();
    assert!(err.is_node_not_registered());
    assert_matches!(err, ClientError::Api { status: 404, .. });
}

#[tokio::test]
async fn registered_node_with_empty_queue_gets_no_job() {
    let (url, _) = spawn_coordinator().await;
    let client = CoordinatorClient::new(&url).unwrap();

    let node = client.register("enc-01", Some("http://10.0.0.5:9000")).await.unwrap();
    assert_eq!(node.name, "enc-01");
    assert!(node.is_active);

    let next = client.next_job("enc-01").await.unwrap();
    assert!(next.job.is_none());
    assert!(next.reason.is_none());
}

#[tokio::test]
async fn reporting_on_a_queued_job_is_a_conflict() {
    let (url, coordinator) = spawn_coordinator().await;
    let client = CoordinatorClient::new(&url).unwrap();
    let job_id = queue(&coordinator, "encode").await;

    let err = client.report_done(job_id).await.unwrap_err();
    assert_matches!(err, ClientError::Api { status: 409, code: Some(ref c), .. } if c == "INVALID_STATE");
}

// ---------------------------------------------------------------------------
// Poll cycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn poll_once_runs_and_completes_a_job() {
    let (url, coordinator) = spawn_coordinator().await;
    let config = agent_config(&url, "enc-01");
    let executor = Arc::new(ScriptedExecutor::default());
    let agent = Agent::new(&config, CoordinatorClient::new(&url).unwrap(), executor.clone());
    let cancel = CancellationToken::new();

    assert!(agent.register_until_ok(&cancel).await);
    assert_eq!(agent.poll_once(&cancel).await, PollOutcome::Idle);

    let job_id = queue(&coordinator, "encode").await;
    assert_eq!(agent.poll_once(&cancel).await, PollOutcome::Completed(job_id));

    let job = coordinator.get_job(job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.progress, 100.0);

    let seen = executor.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].payload, json!({"src": "clip.mov"}));
}

#[tokio::test]
async fn executor_error_is_reported_as_failure() {
    let (url, coordinator) = spawn_coordinator().await;
    let config = agent_config(&url, "enc-01");
    let agent = Agent::new(
        &config,
        CoordinatorClient::new(&url).unwrap(),
        Arc::new(ScriptedExecutor::default()),
    );
    let cancel = CancellationToken::new();
    assert!(agent.register_until_ok(&cancel).await);

    let job_id = queue(&coordinator, "broken").await;
    assert_eq!(agent.poll_once(&cancel).await, PollOutcome::Failed(job_id));

    let job = coordinator.get_job(job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("decoder crashed"));
    assert_eq!(job.progress, 50.0);
}

#[tokio::test]
async fn poll_without_registration_re_registers() {
    let (url, coordinator) = spawn_coordinator().await;
    let config = agent_config(&url, "late-node");
    let agent = Agent::new(
        &config,
        CoordinatorClient::new(&url).unwrap(),
        Arc::new(ScriptedExecutor::default()),
    );
    let cancel = CancellationToken::new();

    assert_eq!(agent.poll_once(&cancel).await, PollOutcome::Unavailable);
    assert!(coordinator.get_node("late-node").await.is_ok());
    assert_eq!(agent.poll_once(&cancel).await, PollOutcome::Idle);
}

// ---------------------------------------------------------------------------
// Full loop
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_drains_queue_and_sends_heartbeats() {
    let (url, coordinator) = spawn_coordinator().await;
    let first = queue(&coordinator, "encode").await;
    let second = queue(&coordinator, "thumbnail").await;

    let config = agent_config(&url, "enc-01");
    let agent = Agent::new(
        &config,
        CoordinatorClient::new(&url).unwrap(),
        Arc::new(ScriptedExecutor::default()),
    );
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { agent.run(quiet_collector(), cancel).await }
    });

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let a = coordinator.get_job(first).await.unwrap().status;
        let b = coordinator.get_job(second).await.unwrap().status;
        let node = coordinator.get_node("enc-01").await.ok();
        let heartbeat_seen = node.and_then(|n| n.last_seen).is_some();
        if a == JobStatus::Done && b == JobStatus::Done && heartbeat_seen {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "agent did not drain the queue");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("agent stops after cancel")
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_fails_the_running_job() {
    let (url, coordinator) = spawn_coordinator().await;
    let job_id = queue(&coordinator, "encode").await;

    let config = agent_config(&url, "enc-01");
    let agent = Agent::new(&config, CoordinatorClient::new(&url).unwrap(), Arc::new(Hang));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { agent.run(quiet_collector(), cancel).await }
    });

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while coordinator.get_job(job_id).await.unwrap().status != JobStatus::Running {
        assert!(tokio::time::Instant::now() < deadline, "job was never claimed");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("agent stops after cancel")
        .unwrap();

    let job = coordinator.get_job(job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(
        job.error.as_deref(),
        Some("Agent shut down while the job was running")
    );
}
