//! Register, heartbeat and poll-execute-report loops.
//!
//! [`Agent::run`] registers the node, spawns the heartbeat loop and then
//! polls the coordinator for work until the [`CancellationToken`] fires.
//! A job that is running when shutdown starts is reported as failed so it
//! does not stay `running` on the coordinator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::client::{AssignedJob, CoordinatorClient};
use crate::collector::MetricsCollector;
use crate::config::AgentConfig;
use crate::executor::{ExecutionError, JobExecutor, ProgressSink};

/// Delay before retrying after the coordinator could not be reached.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// What a single poll did.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// A job was claimed, executed and reported done.
    Completed(i64),
    /// A job was claimed, executed and reported failed.
    Failed(i64),
    /// The queue was empty.
    Idle,
    /// Admission control turned the node away.
    Rejected(String),
    /// The coordinator could not be reached or refused the request.
    Unavailable,
}

pub struct Agent {
    client: CoordinatorClient,
    executor: Arc<dyn JobExecutor>,
    node_name: String,
    node_address: Option<String>,
    heartbeat_interval: Duration,
    poll_interval: Duration,
}

impl Agent {
    pub fn new(
        config: &AgentConfig,
        client: CoordinatorClient,
        executor: Arc<dyn JobExecutor>,
    ) -> Self {
        Self {
            client,
            executor,
            node_name: config.node_name.clone(),
            node_address: config.node_address.clone(),
            heartbeat_interval: config.heartbeat_interval,
            poll_interval: config.poll_interval,
        }
    }

    /// Run until `cancel` is triggered.
    pub async fn run(&self, collector: MetricsCollector, cancel: CancellationToken) {
        if !self.register_until_ok(&cancel).await {
            return;
        }

        let heartbeat = tokio::spawn(heartbeat_loop(
            self.client.clone(),
            self.node_name.clone(),
            self.heartbeat_interval,
            collector,
            cancel.clone(),
        ));

        tracing::info!(
            node_name = %self.node_name,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Polling for jobs",
        );

        while !cancel.is_cancelled() {
            let delay = match self.poll_once(&cancel).await {
                PollOutcome::Completed(_) | PollOutcome::Failed(_) => continue,
                PollOutcome::Idle | PollOutcome::Rejected(_) => self.poll_interval,
                PollOutcome::Unavailable => RETRY_DELAY,
            };
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        tracing::info!(node_name = %self.node_name, "Poll loop stopping");
        if let Err(e) = heartbeat.await {
            tracing::error!(error = %e, "Heartbeat task panicked");
        }
    }

    /// Register with the coordinator, retrying until it answers.
    ///
    /// Returns `false` if cancelled first.
    pub async fn register_until_ok(&self, cancel: &CancellationToken) -> bool {
        loop {
            match self
                .client
                .register(&self.node_name, self.node_address.as_deref())
                .await
            {
                Ok(node) => {
                    tracing::info!(
                        node_id = node.id,
                        node_name = %node.name,
                        is_active = node.is_active,
                        "Registered with coordinator",
                    );
                    return true;
                }
                Err(e) => {
                    tracing::error!(error = %e, node_name = %self.node_name, "Registration failed");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(RETRY_DELAY) => {}
            }
        }
    }

    /// Ask for one job and, if one is handed out, execute and report it.
    pub async fn poll_once(&self, cancel: &CancellationToken) -> PollOutcome {
        let next = match self.client.next_job(&self.node_name).await {
            Ok(next) => next,
            Err(e) if e.is_node_not_registered() => {
                tracing::warn!(node_name = %self.node_name, "Coordinator forgot this node, re-registering");
                if let Err(e) = self
                    .client
                    .register(&self.node_name, self.node_address.as_deref())
                    .await
                {
                    tracing::error!(error = %e, "Re-registration failed");
                }
                return PollOutcome::Unavailable;
            }
            Err(e) => {
                tracing::error!(error = %e, "Claim request failed");
                return PollOutcome::Unavailable;
            }
        };

        match (next.job, next.reason) {
            (Some(job), _) => self.run_job(job, cancel).await,
            (None, Some(reason)) => {
                tracing::debug!(
                    reason = %reason,
                    score = ?next.score,
                    min_score = ?next.min_score,
                    "Claim rejected",
                );
                PollOutcome::Rejected(reason)
            }
            (None, None) => PollOutcome::Idle,
        }
    }

    async fn run_job(&self, job: AssignedJob, cancel: &CancellationToken) -> PollOutcome {
        tracing::info!(job_id = job.id, job_type = %job.job_type, "Got job");

        let sink = ReportProgress {
            client: &self.client,
            job_id: job.id,
        };
        let result = tokio::select! {
            result = self.executor.execute(&job, &sink) => result,
            _ = cancel.cancelled() => Err(ExecutionError::Cancelled),
        };

        match result {
            Ok(()) => {
                if let Err(e) = self.client.report_done(job.id).await {
                    tracing::error!(job_id = job.id, error = %e, "Failed to report job done");
                }
                tracing::info!(job_id = job.id, "Job done");
                PollOutcome::Completed(job.id)
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(job_id = job.id, error = %message, "Job failed");
                if let Err(e) = self.client.report_fail(job.id, &message).await {
                    tracing::error!(job_id = job.id, error = %e, "Failed to report job failure");
                }
                PollOutcome::Failed(job.id)
            }
        }
    }
}

/// Forwards executor progress to the coordinator. Report failures are
/// logged and otherwise ignored.
struct ReportProgress<'a> {
    client: &'a CoordinatorClient,
    job_id: i64,
}

#[async_trait]
impl ProgressSink for ReportProgress<'_> {
    async fn report(&self, progress: f64) {
        if let Err(e) = self.client.report_progress(self.job_id, progress).await {
            tracing::warn!(job_id = self.job_id, progress, error = %e, "Failed to report progress");
        }
    }
}

/// Push a host metrics sample every `interval` until cancelled.
async fn heartbeat_loop(
    client: CoordinatorClient,
    node_name: String,
    interval: Duration,
    mut collector: MetricsCollector,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Heartbeat loop stopping");
                break;
            }
            _ = ticker.tick() => {
                let sample = collector.sample();
                match client.heartbeat(&node_name, &sample).await {
                    Ok(()) => tracing::debug!(
                        cpu_pct = ?sample.cpu_pct,
                        mem_pct = ?sample.mem_pct,
                        "Heartbeat sent",
                    ),
                    Err(e) => tracing::warn!(error = %e, "Heartbeat failed"),
                }
            }
        }
    }
}
