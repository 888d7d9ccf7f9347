//! PostgreSQL-backed [`CoordinatorStore`].

use async_trait::async_trait;
use mediaq_core::types::{DbId, Timestamp};

use crate::models::job::{Job, JobCounts, NewJob};
use crate::models::job_lock::JobLock;
use crate::models::node::{Heartbeat, Node, RegisterNode};
use crate::repositories::{JobLockRepo, JobRepo, NodeRepo};
use crate::store::{CoordinatorStore, StoreError};
use crate::DbPool;

/// Delegates each store operation to the matching repository.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl CoordinatorStore for PgStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }

    async fn upsert_node(&self, input: &RegisterNode, now: Timestamp) -> Result<Node, StoreError> {
        Ok(NodeRepo::register(&self.pool, input, now).await?)
    }

    async fn find_node_by_name(&self, name: &str) -> Result<Option<Node>, StoreError> {
        Ok(NodeRepo::find_by_name(&self.pool, name).await?)
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, StoreError> {
        Ok(NodeRepo::list(&self.pool).await?)
    }

    async fn list_active_nodes(&self) -> Result<Vec<Node>, StoreError> {
        Ok(NodeRepo::list_active(&self.pool).await?)
    }

    async fn record_heartbeat(
        &self,
        input: &Heartbeat,
        now: Timestamp,
    ) -> Result<Option<Node>, StoreError> {
        Ok(NodeRepo::record_heartbeat(&self.pool, input, now).await?)
    }

    async fn set_node_active(&self, name: &str, is_active: bool) -> Result<Option<Node>, StoreError> {
        Ok(NodeRepo::set_active(&self.pool, name, is_active).await?)
    }

    async fn insert_job(&self, input: &NewJob, now: Timestamp) -> Result<Job, StoreError> {
        Ok(JobRepo::insert(&self.pool, input, now).await?)
    }

    async fn find_job(&self, id: DbId) -> Result<Option<Job>, StoreError> {
        Ok(JobRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_recent_jobs(&self, limit: i64) -> Result<Vec<Job>, StoreError> {
        Ok(JobRepo::list_recent(&self.pool, limit).await?)
    }

    async fn count_jobs_by_status(&self) -> Result<JobCounts, StoreError> {
        Ok(JobRepo::count_by_status(&self.pool).await?)
    }

    async fn claim_next_queued(
        &self,
        node_id: DbId,
        now: Timestamp,
    ) -> Result<Option<Job>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some(job) = JobRepo::claim_next(&mut *tx, node_id, now).await? else {
            tx.rollback().await?;
            return Ok(None);
        };
        JobLockRepo::insert(&mut *tx, job.id, node_id, now).await?;

        tx.commit().await?;
        Ok(Some(job))
    }

    async fn release_pins(&self, node_ids: &[DbId]) -> Result<u64, StoreError> {
        Ok(JobRepo::release_pins(&self.pool, node_ids).await?)
    }

    async fn update_progress(&self, job_id: DbId, progress: f64) -> Result<bool, StoreError> {
        Ok(JobRepo::update_progress(&self.pool, job_id, progress).await?)
    }

    async fn complete_job(&self, job_id: DbId, now: Timestamp) -> Result<bool, StoreError> {
        Ok(JobRepo::complete(&self.pool, job_id, now).await?)
    }

    async fn fail_job(&self, job_id: DbId, error: &str, now: Timestamp) -> Result<bool, StoreError> {
        Ok(JobRepo::fail(&self.pool, job_id, error, now).await?)
    }

    async fn list_job_locks(&self, job_id: DbId) -> Result<Vec<JobLock>, StoreError> {
        Ok(JobLockRepo::list_for_job(&self.pool, job_id).await?)
    }
}
