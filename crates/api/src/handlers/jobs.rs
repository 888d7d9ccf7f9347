//! Handlers for the `/jobs` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use mediaq_core::types::DbId;
use mediaq_db::models::job::CreateJob;

use crate::error::AppResult;
use crate::extract::JsonBody;
use crate::middleware::rbac::{RequireAuth, RequireCreator};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/jobs
///
/// Queue a new job. Returns 201 with the created job.
pub async fn create_job(
    RequireCreator(user): RequireCreator,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CreateJob>,
) -> AppResult<impl IntoResponse> {
    let job = state
        .coordinator
        .create_job(&input, Some(user.user_id))
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = state.coordinator.get_job(job_id).await?;
    Ok(Json(DataResponse { data: job }))
}
