//! Handlers for the worker claim and report protocol.
//!
//! A node polls `next-job`; a rejection or an empty queue both come back as
//! `job: null` and the node simply polls again.

use axum::extract::{Path, State};
use axum::Json;
use mediaq_core::types::DbId;
use mediaq_db::models::job::{ClaimedJob, Job};
use mediaq_scheduler::ClaimOutcome;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::extract::JsonBody;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct NextJobRequest {
    pub node_name: String,
}

/// Body of a claim response. `reason`, `score` and `min_score` are only
/// present when admission turned the node away.
#[derive(Debug, Serialize)]
pub struct NextJobResponse {
    pub job: Option<ClaimedJob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
}

impl From<ClaimOutcome> for NextJobResponse {
    fn from(outcome: ClaimOutcome) -> Self {
        match outcome {
            ClaimOutcome::Claimed(job) => Self {
                job: Some(job),
                reason: None,
                score: None,
                min_score: None,
            },
            ClaimOutcome::Empty => Self {
                job: None,
                reason: None,
                score: None,
                min_score: None,
            },
            ClaimOutcome::Rejected(rejection) => Self {
                job: None,
                reason: Some(rejection.reason()),
                score: Some(rejection.score()),
                min_score: rejection.min_score(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub progress: f64,
}

#[derive(Debug, Deserialize)]
pub struct FailRequest {
    #[serde(default)]
    pub error: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/worker/next-job
pub async fn next_job(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<NextJobRequest>,
) -> AppResult<Json<DataResponse<NextJobResponse>>> {
    let outcome = state.coordinator.claim_next(&input.node_name).await?;
    Ok(Json(DataResponse {
        data: outcome.into(),
    }))
}

/// POST /api/v1/worker/jobs/{id}/progress
pub async fn report_progress(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    JsonBody(input): JsonBody<ProgressRequest>,
) -> AppResult<Json<DataResponse<Job>>> {
    let job = state
        .coordinator
        .report_progress(job_id, input.progress)
        .await?;
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/worker/jobs/{id}/done
pub async fn report_done(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Job>>> {
    let job = state.coordinator.report_done(job_id).await?;
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/worker/jobs/{id}/fail
pub async fn report_fail(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    JsonBody(input): JsonBody<FailRequest>,
) -> AppResult<Json<DataResponse<Job>>> {
    let job = state.coordinator.report_fail(job_id, &input.error).await?;
    Ok(Json(DataResponse { data: job }))
}
