//! In-process [`CoordinatorStore`] used by tests and single-binary setups.
//!
//! Each job row carries two mutexes: `claim`, which only claimants touch,
//! and `job`, which guards the data and is held briefly by every reader and
//! writer. Claiming walks the rows oldest-first and uses `try_lock` on
//! `claim`, so a row another claimant is holding is skipped instead of
//! waited on, while a concurrent read never hides a queued row. The status
//! is re-checked under the data lock before the transition, which makes the
//! claim a compare-and-swap.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use mediaq_core::status::JobStatus;
use mediaq_core::types::{DbId, Timestamp};
use tokio::sync::{Mutex, RwLock};

use crate::models::job::{Job, JobCounts, NewJob};
use crate::models::job_lock::JobLock;
use crate::models::node::{Heartbeat, Node, RegisterNode};
use crate::store::{CoordinatorStore, StoreError};

#[derive(Default)]
struct NodeTable {
    rows: BTreeMap<DbId, Node>,
    by_name: HashMap<String, DbId>,
}

impl NodeTable {
    fn get_by_name_mut(&mut self, name: &str) -> Option<&mut Node> {
        let id = self.by_name.get(name)?;
        self.rows.get_mut(id)
    }

    fn sorted_by_name(&self, filter: impl Fn(&Node) -> bool) -> Vec<Node> {
        let mut nodes: Vec<Node> = self.rows.values().filter(|n| filter(n)).cloned().collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        nodes
    }
}

struct JobRow {
    /// Immutable copy of `job.created_at`, readable without the row lock.
    created_at: Timestamp,
    /// Held by the claimant inspecting this row.
    claim: Mutex<()>,
    job: Mutex<Job>,
}

#[derive(Default)]
pub struct MemoryStore {
    nodes: Mutex<NodeTable>,
    jobs: RwLock<BTreeMap<DbId, Arc<JobRow>>>,
    locks: Mutex<Vec<JobLock>>,
    next_node_id: AtomicI64,
    next_job_id: AtomicI64,
    next_lock_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(counter: &AtomicI64) -> DbId {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Snapshot of all job rows, oldest first.
    async fn rows_oldest_first(&self) -> Vec<Arc<JobRow>> {
        let mut rows: Vec<Arc<JobRow>> = self.jobs.read().await.values().cloned().collect();
        rows.sort_by_key(|row| row.created_at);
        rows
    }

    async fn row(&self, id: DbId) -> Option<Arc<JobRow>> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// Apply `update` to a job only if it is currently running.
    async fn update_running(&self, job_id: DbId, update: impl FnOnce(&mut Job)) -> bool {
        let Some(row) = self.row(job_id).await else {
            return false;
        };
        let mut job = row.job.lock().await;
        if job.status != JobStatus::Running {
            return false;
        }
        update(&mut job);
        true
    }
}

#[async_trait]
impl CoordinatorStore for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    // ── Nodes ────────────────────────────────────────────────────────────

    async fn upsert_node(&self, input: &RegisterNode, now: Timestamp) -> Result<Node, StoreError> {
        let mut table = self.nodes.lock().await;

        if let Some(node) = table.get_by_name_mut(&input.name) {
            if let Some(address) = &input.address {
                node.address = Some(address.clone());
                node.updated_at = now;
            }
            return Ok(node.clone());
        }

        let node = Node {
            id: Self::next_id(&self.next_node_id),
            name: input.name.clone(),
            address: input.address.clone(),
            last_seen: None,
            cpu_pct: None,
            mem_pct: None,
            net_in: None,
            net_out: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        table.by_name.insert(node.name.clone(), node.id);
        table.rows.insert(node.id, node.clone());
        Ok(node)
    }

    async fn find_node_by_name(&self, name: &str) -> Result<Option<Node>, StoreError> {
        let mut table = self.nodes.lock().await;
        Ok(table.get_by_name_mut(name).map(|n| n.clone()))
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, StoreError> {
        Ok(self.nodes.lock().await.sorted_by_name(|_| true))
    }

    async fn list_active_nodes(&self) -> Result<Vec<Node>, StoreError> {
        Ok(self.nodes.lock().await.sorted_by_name(|n| n.is_active))
    }

    async fn record_heartbeat(
        &self,
        input: &Heartbeat,
        now: Timestamp,
    ) -> Result<Option<Node>, StoreError> {
        let mut table = self.nodes.lock().await;
        let Some(node) = table.get_by_name_mut(&input.name) else {
            return Ok(None);
        };

        node.last_seen = Some(now);
        node.cpu_pct = input.cpu_pct.or(node.cpu_pct);
        node.mem_pct = input.mem_pct.or(node.mem_pct);
        node.net_in = input.net_in.or(node.net_in);
        node.net_out = input.net_out.or(node.net_out);
        node.updated_at = now;
        Ok(Some(node.clone()))
    }

    async fn set_node_active(&self, name: &str, is_active: bool) -> Result<Option<Node>, StoreError> {
        let mut table = self.nodes.lock().await;
        Ok(table.get_by_name_mut(name).map(|node| {
            node.is_active = is_active;
            node.clone()
        }))
    }

    // ── Jobs ─────────────────────────────────────────────────────────────

    async fn insert_job(&self, input: &NewJob, now: Timestamp) -> Result<Job, StoreError> {
        let job = Job {
            id: Self::next_id(&self.next_job_id),
            job_type: input.job_type.clone(),
            payload: input.payload.clone(),
            status: JobStatus::Queued,
            assigned_node_id: input.assigned_node_id,
            submitted_by: input.submitted_by,
            progress: 0.0,
            error: None,
            created_at: now,
            started_at: None,
            finished_at: None,
        };
        let row = Arc::new(JobRow {
            created_at: now,
            claim: Mutex::new(()),
            job: Mutex::new(job.clone()),
        });
        self.jobs.write().await.insert(job.id, row);
        Ok(job)
    }

    async fn find_job(&self, id: DbId) -> Result<Option<Job>, StoreError> {
        match self.row(id).await {
            Some(row) => Ok(Some(row.job.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn list_recent_jobs(&self, limit: i64) -> Result<Vec<Job>, StoreError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let rows = self.rows_oldest_first().await;
        let mut jobs = Vec::with_capacity(limit.min(rows.len()));
        for row in rows.iter().rev().take(limit) {
            jobs.push(row.job.lock().await.clone());
        }
        Ok(jobs)
    }

    async fn count_jobs_by_status(&self) -> Result<JobCounts, StoreError> {
        let rows: Vec<Arc<JobRow>> = self.jobs.read().await.values().cloned().collect();
        let mut counts = JobCounts::default();
        for row in rows {
            counts.add(row.job.lock().await.status, 1);
        }
        Ok(counts)
    }

    async fn claim_next_queued(
        &self,
        node_id: DbId,
        now: Timestamp,
    ) -> Result<Option<Job>, StoreError> {
        for row in self.rows_oldest_first().await {
            // Another claimant is on this row: skip it.
            let Ok(_claiming) = row.claim.try_lock() else {
                continue;
            };
            let mut job = row.job.lock().await;
            if job.status != JobStatus::Queued {
                continue;
            }

            job.status = JobStatus::Running;
            job.assigned_node_id = Some(node_id);
            job.started_at = Some(now);

            self.locks.lock().await.push(JobLock {
                id: Self::next_id(&self.next_lock_id),
                job_id: job.id,
                node_id,
                locked_at: now,
            });
            return Ok(Some(job.clone()));
        }
        Ok(None)
    }

    async fn release_pins(&self, node_ids: &[DbId]) -> Result<u64, StoreError> {
        if node_ids.is_empty() {
            return Ok(0);
        }
        let mut released = 0;
        for row in self.rows_oldest_first().await {
            let mut job = row.job.lock().await;
            let pinned = job.assigned_node_id.is_some_and(|id| node_ids.contains(&id));
            if job.status == JobStatus::Queued && pinned {
                job.assigned_node_id = None;
                released += 1;
            }
        }
        Ok(released)
    }

    async fn update_progress(&self, job_id: DbId, progress: f64) -> Result<bool, StoreError> {
        Ok(self
            .update_running(job_id, |job| job.progress = progress)
            .await)
    }

    async fn complete_job(&self, job_id: DbId, now: Timestamp) -> Result<bool, StoreError> {
        Ok(self
            .update_running(job_id, |job| {
                job.status = JobStatus::Done;
                job.progress = 100.0;
                job.finished_at = Some(now);
            })
            .await)
    }

    async fn fail_job(&self, job_id: DbId, error: &str, now: Timestamp) -> Result<bool, StoreError> {
        Ok(self
            .update_running(job_id, |job| {
                job.status = JobStatus::Failed;
                job.error = Some(error.to_string());
                job.finished_at = Some(now);
            })
            .await)
    }

    async fn list_job_locks(&self, job_id: DbId) -> Result<Vec<JobLock>, StoreError> {
        let locks = self.locks.lock().await;
        Ok(locks.iter().filter(|l| l.job_id == job_id).cloned().collect())
    }
}
