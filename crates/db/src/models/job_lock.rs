//! Claim audit records.

use mediaq_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the append-only `job_locks` table: node `node_id` claimed
/// job `job_id` at `locked_at`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct JobLock {
    pub id: DbId,
    pub job_id: DbId,
    pub node_id: DbId,
    pub locked_at: Timestamp,
}
