//! Repository for the `jobs` table.
//!
//! Uses `JobStatus` from `mediaq_core::status` for every status literal.
//! Lifecycle updates are conditional on the current status so a racing
//! transition can never be overwritten.

use mediaq_core::status::{JobStatus, StatusId};
use mediaq_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::job::{Job, JobCounts, NewJob};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, job_type, payload, status_id, assigned_node_id, submitted_by, \
    progress, error, created_at, started_at, finished_at";

/// Provides queue and lifecycle operations for jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new queued job.
    pub async fn insert(pool: &PgPool, input: &NewJob, now: Timestamp) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (job_type, payload, status_id, submitted_by, assigned_node_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(&input.job_type)
            .bind(&input.payload)
            .bind(JobStatus::Queued.id())
            .bind(input.submitted_by)
            .bind(input.assigned_node_id)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// Atomically claim the oldest queued job for `node_id`.
    ///
    /// `FOR UPDATE SKIP LOCKED` makes a concurrent claimant skip the row
    /// another transaction is already transitioning and move on to the next
    /// one, so two callers never receive the same job and neither blocks.
    pub async fn claim_next(
        conn: &mut PgConnection,
        node_id: DbId,
        now: Timestamp,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $2, assigned_node_id = $1, started_at = $4 \
             WHERE id = ( \
                 SELECT id FROM jobs \
                 WHERE status_id = $3 \
                 ORDER BY created_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             AND status_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(node_id)
            .bind(JobStatus::Running.id())
            .bind(JobStatus::Queued.id())
            .bind(now)
            .fetch_optional(conn)
            .await
    }

    /// Clear the advisory pin on every queued job pinned to one of `node_ids`.
    ///
    /// Returns the number of jobs released.
    pub async fn release_pins(pool: &PgPool, node_ids: &[DbId]) -> Result<u64, sqlx::Error> {
        if node_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE jobs SET assigned_node_id = NULL \
             WHERE status_id = $1 AND assigned_node_id = ANY($2)",
        )
        .bind(JobStatus::Queued.id())
        .bind(node_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Store a (pre-clamped) progress value on a running job.
    ///
    /// Returns `false` if the job is not running.
    pub async fn update_progress(
        pool: &PgPool,
        job_id: DbId,
        progress: f64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE jobs SET progress = $2 WHERE id = $1 AND status_id = $3")
            .bind(job_id)
            .bind(progress)
            .bind(JobStatus::Running.id())
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a running job as done with progress 100.
    ///
    /// Returns `false` if the job is not running.
    pub async fn complete(pool: &PgPool, job_id: DbId, now: Timestamp) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, progress = 100, finished_at = $3 \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(job_id)
        .bind(JobStatus::Done.id())
        .bind(now)
        .bind(JobStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a running job as failed with a (pre-truncated) error message.
    ///
    /// Returns `false` if the job is not running.
    pub async fn fail(
        pool: &PgPool,
        job_id: DbId,
        error: &str,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, error = $3, finished_at = $4 \
             WHERE id = $1 AND status_id = $5",
        )
        .bind(job_id)
        .bind(JobStatus::Failed.id())
        .bind(error)
        .bind(now)
        .bind(JobStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Most recently created jobs first.
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs ORDER BY created_at DESC, id DESC LIMIT $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Count jobs grouped by status.
    pub async fn count_by_status(pool: &PgPool) -> Result<JobCounts, sqlx::Error> {
        let rows: Vec<(StatusId, i64)> =
            sqlx::query_as("SELECT status_id, COUNT(*) FROM jobs GROUP BY status_id")
                .fetch_all(pool)
                .await?;

        let mut counts = JobCounts::default();
        for (status_id, count) in rows {
            match JobStatus::try_from(status_id) {
                Ok(status) => counts.add(status, count),
                Err(e) => tracing::warn!(status_id, error = %e, "Skipping unknown job status"),
            }
        }
        Ok(counts)
    }
}
