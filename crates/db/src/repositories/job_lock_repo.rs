//! Repository for the append-only `job_locks` table.

use mediaq_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::job_lock::JobLock;

/// Column list for `job_locks` queries.
const COLUMNS: &str = "id, job_id, node_id, locked_at";

pub struct JobLockRepo;

impl JobLockRepo {
    /// Append a claim record. Runs on the claim transaction's connection.
    pub async fn insert(
        conn: &mut PgConnection,
        job_id: DbId,
        node_id: DbId,
        now: Timestamp,
    ) -> Result<JobLock, sqlx::Error> {
        let query = format!(
            "INSERT INTO job_locks (job_id, node_id, locked_at) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobLock>(&query)
            .bind(job_id)
            .bind(node_id)
            .bind(now)
            .fetch_one(conn)
            .await
    }

    /// Claim history for a job, oldest first.
    pub async fn list_for_job(pool: &PgPool, job_id: DbId) -> Result<Vec<JobLock>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM job_locks WHERE job_id = $1 ORDER BY locked_at ASC, id ASC"
        );
        sqlx::query_as::<_, JobLock>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }
}
