//! The coordinator service.
//!
//! Every operation reads the current cluster state from the injected
//! [`CoordinatorStore`] and stamps times from the injected [`Clock`], so the
//! same code runs against PostgreSQL in production and the in-memory store
//! in tests.

use std::sync::Arc;

use mediaq_core::admission::{self, check_least_loaded, check_overload, NodeView};
use mediaq_core::clock::Clock;
use mediaq_core::error::CoreError;
use mediaq_core::liveness::is_stale;
use mediaq_core::load::min_score;
use mediaq_core::status::JobStatus;
use mediaq_core::types::DbId;
use mediaq_core::validation::{
    clamp_list_limit, clamp_progress, truncate_error, validate_counter, validate_job_type,
    validate_node_name, validate_percentage,
};
use mediaq_db::models::job::{ClaimedJob, CreateJob, Job, NewJob};
use mediaq_db::models::job_lock::JobLock;
use mediaq_db::models::node::{Heartbeat, Node, RegisterNode};
use mediaq_db::CoordinatorStore;

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::views::{ClaimOutcome, JobSummary, NodeStatus, NodeSummary, Summary};

/// Cheaply cloneable handle over a store and a clock.
#[derive(Clone)]
pub struct Coordinator {
    store: Arc<dyn CoordinatorStore>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn CoordinatorStore>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Confirm the backing store is reachable.
    pub async fn health_check(&self) -> Result<(), SchedulerError> {
        Ok(self.store.health_check().await?)
    }

    // ---------------------------------------------------------------------
    // Node registry
    // ---------------------------------------------------------------------

    /// Register a node by name. Re-registering returns the existing node and
    /// only updates its address when a new one is given.
    pub async fn register(&self, input: &RegisterNode) -> Result<Node, SchedulerError> {
        validate_node_name(&input.name)?;

        let node = self.store.upsert_node(input, self.clock.now()).await?;
        tracing::info!(
            node_id = node.id,
            node_name = %node.name,
            address = ?node.address,
            "Node registered",
        );
        Ok(node)
    }

    pub async fn get_node(&self, name: &str) -> Result<Node, SchedulerError> {
        self.store
            .find_node_by_name(name)
            .await?
            .ok_or_else(|| CoreError::node_not_registered(name).into())
    }

    /// Nodes with the administrative enable flag set.
    pub async fn list_active(&self) -> Result<Vec<Node>, SchedulerError> {
        Ok(self.store.list_active_nodes().await?)
    }

    /// Flip a node's administrative enable flag.
    pub async fn set_active(&self, name: &str, is_active: bool) -> Result<Node, SchedulerError> {
        let node = self
            .store
            .set_node_active(name, is_active)
            .await?
            .ok_or_else(|| CoreError::node_not_registered(name))?;

        tracing::info!(node_id = node.id, node_name = %node.name, is_active, "Node activation changed");
        Ok(node)
    }

    // ---------------------------------------------------------------------
    // Heartbeats
    // ---------------------------------------------------------------------

    /// Record a heartbeat. Omitted metrics keep their stored values.
    pub async fn record_heartbeat(&self, input: &Heartbeat) -> Result<Node, SchedulerError> {
        validate_percentage("cpu_pct", input.cpu_pct)?;
        validate_percentage("mem_pct", input.mem_pct)?;
        validate_counter("net_in", input.net_in)?;
        validate_counter("net_out", input.net_out)?;

        let node = self
            .store
            .record_heartbeat(input, self.clock.now())
            .await?
            .ok_or_else(|| CoreError::node_not_registered(&input.name))?;

        tracing::debug!(
            node_name = %node.name,
            cpu_pct = ?node.cpu_pct,
            mem_pct = ?node.mem_pct,
            "Heartbeat recorded",
        );
        Ok(node)
    }

    // ---------------------------------------------------------------------
    // Claim protocol
    // ---------------------------------------------------------------------

    /// Admission control followed by an atomic claim of the oldest queued
    /// job.
    ///
    /// Rejections and an empty queue are normal outcomes, not errors.
    /// Losing a race for a row is invisible to the caller: the store skips
    /// to the next candidate.
    pub async fn claim_next(&self, node_name: &str) -> Result<ClaimOutcome, SchedulerError> {
        let node = self.get_node(node_name).await?;
        let candidate = node.view();

        if let Err(rejection) = check_overload(&candidate) {
            tracing::info!(
                node_name,
                reason = rejection.reason(),
                score = rejection.score(),
                "Claim rejected",
            );
            return Ok(ClaimOutcome::Rejected(rejection));
        }

        let now = self.clock.now();
        let views: Vec<NodeView> = self
            .store
            .list_active_nodes()
            .await?
            .iter()
            .map(Node::view)
            .collect();

        self.release_overloaded_pins(&views, "reclaim sweep").await?;

        let policy = self.config.admission_policy();
        if let Err(rejection) = check_least_loaded(&candidate, &views, now, &policy) {
            tracing::info!(
                node_name,
                reason = rejection.reason(),
                score = rejection.score(),
                min_score = ?rejection.min_score(),
                "Claim rejected",
            );
            return Ok(ClaimOutcome::Rejected(rejection));
        }

        match self.store.claim_next_queued(node.id, now).await? {
            Some(job) => {
                tracing::info!(
                    job_id = job.id,
                    node_id = node.id,
                    node_name,
                    job_type = %job.job_type,
                    "Job claimed by node",
                );
                Ok(ClaimOutcome::Claimed(ClaimedJob::from(&job)))
            }
            None => Ok(ClaimOutcome::Empty),
        }
    }

    // ---------------------------------------------------------------------
    // Job lifecycle
    // ---------------------------------------------------------------------

    /// Queue a new job. A `preferred_node` sets an advisory pin that the
    /// reclaim sweep and the rebalancer may clear.
    pub async fn create_job(
        &self,
        input: &CreateJob,
        submitted_by: Option<DbId>,
    ) -> Result<Job, SchedulerError> {
        validate_job_type(&input.job_type)?;

        let assigned_node_id = match &input.preferred_node {
            Some(name) => Some(self.get_node(name).await?.id),
            None => None,
        };

        let new_job = NewJob {
            job_type: input.job_type.clone(),
            payload: input.payload.clone(),
            submitted_by,
            assigned_node_id,
        };
        let job = self.store.insert_job(&new_job, self.clock.now()).await?;

        tracing::info!(
            job_id = job.id,
            job_type = %job.job_type,
            submitted_by = ?job.submitted_by,
            assigned_node_id = ?job.assigned_node_id,
            "Job queued",
        );
        Ok(job)
    }

    pub async fn get_job(&self, job_id: DbId) -> Result<Job, SchedulerError> {
        self.store
            .find_job(job_id)
            .await?
            .ok_or_else(|| CoreError::job_not_found(job_id).into())
    }

    /// Store a progress value (clamped to 0..=100) on a running job.
    pub async fn report_progress(&self, job_id: DbId, value: f64) -> Result<Job, SchedulerError> {
        let progress = clamp_progress(value)?;
        self.get_job(job_id).await?.status.ensure_running()?;

        let updated = self.store.update_progress(job_id, progress).await?;
        let job = self.after_update(job_id, updated).await?;

        tracing::debug!(job_id, progress, "Job progress updated");
        Ok(job)
    }

    /// Mark a running job as done.
    pub async fn report_done(&self, job_id: DbId) -> Result<Job, SchedulerError> {
        self.get_job(job_id).await?.status.ensure_transition(JobStatus::Done)?;

        let updated = self.store.complete_job(job_id, self.clock.now()).await?;
        let job = self.after_update(job_id, updated).await?;

        tracing::info!(job_id, node_id = ?job.assigned_node_id, "Job completed");
        Ok(job)
    }

    /// Mark a running job as failed. The message is cut to the storable
    /// length.
    pub async fn report_fail(&self, job_id: DbId, error: &str) -> Result<Job, SchedulerError> {
        self.get_job(job_id).await?.status.ensure_transition(JobStatus::Failed)?;

        let error = truncate_error(error);
        let updated = self.store.fail_job(job_id, &error, self.clock.now()).await?;
        let job = self.after_update(job_id, updated).await?;

        tracing::warn!(job_id, node_id = ?job.assigned_node_id, error = %error, "Job failed");
        Ok(job)
    }

    /// Re-read a job after a conditional update.
    ///
    /// A `false` update means another transition won between the status
    /// check and the write; the job's current status is reported instead.
    async fn after_update(&self, job_id: DbId, updated: bool) -> Result<Job, SchedulerError> {
        let job = self.get_job(job_id).await?;
        if !updated {
            return Err(CoreError::InvalidState(format!(
                "Job {job_id} is {}, not running",
                job.status
            ))
            .into());
        }
        Ok(job)
    }

    // ---------------------------------------------------------------------
    // Rebalancing
    // ---------------------------------------------------------------------

    /// Clear the pins of queued jobs held by overloaded active nodes.
    ///
    /// Returns the number of jobs released.
    pub async fn rebalance_queued(&self) -> Result<u64, SchedulerError> {
        let views: Vec<NodeView> = self
            .store
            .list_active_nodes()
            .await?
            .iter()
            .map(Node::view)
            .collect();
        self.release_overloaded_pins(&views, "rebalance").await
    }

    async fn release_overloaded_pins(
        &self,
        views: &[NodeView],
        trigger: &'static str,
    ) -> Result<u64, SchedulerError> {
        let overloaded = admission::overloaded_active_ids(views);
        if overloaded.is_empty() {
            return Ok(0);
        }

        let released = self.store.release_pins(&overloaded).await?;
        if released > 0 {
            tracing::info!(
                trigger,
                released,
                node_ids = ?overloaded,
                "Released queued jobs pinned to overloaded nodes",
            );
        }
        Ok(released)
    }

    // ---------------------------------------------------------------------
    // Observability
    // ---------------------------------------------------------------------

    /// All nodes by name, with score, overload and staleness.
    pub async fn list_nodes(&self) -> Result<Vec<NodeStatus>, SchedulerError> {
        let nodes = self.store.list_nodes().await?;
        Ok(nodes.into_iter().map(|n| self.node_status(n)).collect())
    }

    /// Newest jobs first. `limit` defaults to 50 and is clamped to 1..=200.
    pub async fn list_jobs(&self, limit: Option<i64>) -> Result<Vec<Job>, SchedulerError> {
        Ok(self.store.list_recent_jobs(clamp_list_limit(limit)).await?)
    }

    /// Claim audit history of a job, oldest first.
    pub async fn job_locks(&self, job_id: DbId) -> Result<Vec<JobLock>, SchedulerError> {
        self.get_job(job_id).await?;
        Ok(self.store.list_job_locks(job_id).await?)
    }

    /// Job totals and an overview of administratively active nodes.
    pub async fn summary(&self) -> Result<Summary, SchedulerError> {
        let counts = self.store.count_jobs_by_status().await?;
        let items: Vec<NodeStatus> = self
            .store
            .list_active_nodes()
            .await?
            .into_iter()
            .map(|n| self.node_status(n))
            .collect();

        let loads: Vec<_> = items.iter().map(|s| s.node.load()).collect();
        let least_score = min_score(&loads);
        let overloaded = items.iter().filter(|s| s.overloaded).count();

        Ok(Summary {
            jobs: JobSummary {
                total: counts.total(),
                by_status: counts,
            },
            nodes: NodeSummary {
                count: items.len(),
                least_score,
                overloaded,
                items,
            },
        })
    }

    fn node_status(&self, node: Node) -> NodeStatus {
        let load = node.load();
        let stale = is_stale(node.last_seen, self.clock.now(), self.config.stale_window());
        NodeStatus {
            score: load.score(),
            overloaded: load.is_overloaded(),
            stale,
            node,
        }
    }
}
