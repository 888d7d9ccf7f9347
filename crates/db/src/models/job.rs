//! Job entity models and DTOs.

use mediaq_core::status::JobStatus;
use mediaq_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `jobs` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    #[serde(rename = "type")]
    pub job_type: String,
    pub payload: serde_json::Value,
    #[sqlx(rename = "status_id", try_from = "i16")]
    pub status: JobStatus,
    pub assigned_node_id: Option<DbId>,
    pub submitted_by: Option<DbId>,
    pub progress: f64,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
}

/// DTO for `POST /api/v1/jobs`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateJob {
    #[serde(rename = "type")]
    pub job_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Optional node name to pin the queued job to. The pin is advisory:
    /// any admitted node may still claim the job.
    pub preferred_node: Option<String>,
}

/// Fully resolved insert for the `jobs` table.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub job_type: String,
    pub payload: serde_json::Value,
    pub submitted_by: Option<DbId>,
    pub assigned_node_id: Option<DbId>,
}

/// What a worker receives when it wins a claim.
///
/// The payload is handed over verbatim; the coordinator never inspects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimedJob {
    pub id: DbId,
    #[serde(rename = "type")]
    pub job_type: String,
    pub payload: serde_json::Value,
}

impl From<&Job> for ClaimedJob {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            job_type: job.job_type.clone(),
            payload: job.payload.clone(),
        }
    }
}

/// Job totals per lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub queued: i64,
    pub running: i64,
    pub done: i64,
    pub failed: i64,
}

impl JobCounts {
    pub fn total(&self) -> i64 {
        self.queued + self.running + self.done + self.failed
    }

    /// Add `count` jobs of the given status.
    pub fn add(&mut self, status: JobStatus, count: i64) {
        match status {
            JobStatus::Queued => self.queued += count,
            JobStatus::Running => self.running += count,
            JobStatus::Done => self.done += count,
            JobStatus::Failed => self.failed += count,
        }
    }
}
