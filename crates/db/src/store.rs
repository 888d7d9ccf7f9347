//! The storage seam the coordinator is written against.
//!
//! Any backend that offers per-row atomic read-modify-write can implement
//! [`CoordinatorStore`]. The one operation with real contention is
//! [`CoordinatorStore::claim_next_queued`]; every other method touches a
//! single row, or a set of rows with a single conditional statement.

use async_trait::async_trait;
use mediaq_core::types::{DbId, Timestamp};

use crate::models::job::{Job, JobCounts, NewJob};
use crate::models::job_lock::JobLock;
use crate::models::node::{Heartbeat, Node, RegisterNode};

/// Errors raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait CoordinatorStore: Send + Sync {
    /// Confirm the backend is reachable.
    async fn health_check(&self) -> Result<(), StoreError>;

    // ── Nodes ────────────────────────────────────────────────────────────

    /// Insert a node, or update the address of the existing node with the
    /// same name (only when a new address is supplied).
    async fn upsert_node(&self, input: &RegisterNode, now: Timestamp) -> Result<Node, StoreError>;

    async fn find_node_by_name(&self, name: &str) -> Result<Option<Node>, StoreError>;

    /// All nodes ordered by name.
    async fn list_nodes(&self) -> Result<Vec<Node>, StoreError>;

    /// Nodes with `is_active = true`, ordered by name.
    async fn list_active_nodes(&self) -> Result<Vec<Node>, StoreError>;

    /// Stamp `last_seen = now` and overwrite the supplied metrics.
    /// Returns `None` for an unknown node name.
    async fn record_heartbeat(
        &self,
        input: &Heartbeat,
        now: Timestamp,
    ) -> Result<Option<Node>, StoreError>;

    /// Returns `None` for an unknown node name.
    async fn set_node_active(&self, name: &str, is_active: bool) -> Result<Option<Node>, StoreError>;

    // ── Jobs ─────────────────────────────────────────────────────────────

    async fn insert_job(&self, input: &NewJob, now: Timestamp) -> Result<Job, StoreError>;

    async fn find_job(&self, id: DbId) -> Result<Option<Job>, StoreError>;

    /// Newest jobs first, at most `limit`.
    async fn list_recent_jobs(&self, limit: i64) -> Result<Vec<Job>, StoreError>;

    async fn count_jobs_by_status(&self) -> Result<JobCounts, StoreError>;

    /// Move the oldest queued job to running for `node_id` and append a
    /// [`JobLock`] for it, atomically.
    ///
    /// Must never hand the same job to two concurrent callers and must not
    /// fail because of contention: a row that another claimant holds is
    /// skipped in favour of the next candidate.
    async fn claim_next_queued(&self, node_id: DbId, now: Timestamp)
        -> Result<Option<Job>, StoreError>;

    /// Clear `assigned_node_id` on queued jobs pinned to any of `node_ids`.
    /// Returns the number of jobs released.
    async fn release_pins(&self, node_ids: &[DbId]) -> Result<u64, StoreError>;

    /// Conditional on the job being running. Returns whether a row changed.
    async fn update_progress(&self, job_id: DbId, progress: f64) -> Result<bool, StoreError>;

    /// Conditional on the job being running. Returns whether a row changed.
    async fn complete_job(&self, job_id: DbId, now: Timestamp) -> Result<bool, StoreError>;

    /// Conditional on the job being running. Returns whether a row changed.
    async fn fail_job(&self, job_id: DbId, error: &str, now: Timestamp) -> Result<bool, StoreError>;

    /// Claim audit history for a job, oldest first.
    async fn list_job_locks(&self, job_id: DbId) -> Result<Vec<JobLock>, StoreError>;
}
