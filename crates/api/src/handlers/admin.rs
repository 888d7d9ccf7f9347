//! Operator endpoints: node administration, monitoring and maintenance.
//!
//! Every handler requires the `admin` role.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use mediaq_core::types::DbId;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct JobListParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RebalanceResponse {
    pub requeued: u64,
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/nodes
pub async fn list_nodes(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let nodes = state.coordinator.list_nodes().await?;
    Ok(Json(DataResponse { data: nodes }))
}

/// POST /api/v1/admin/nodes/{name}/activate
pub async fn activate_node(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let node = state.coordinator.set_active(&name, true).await?;
    tracing::info!(node_name = %name, admin_id = admin.user_id, "Node activated by admin");
    Ok(Json(DataResponse { data: node }))
}

/// POST /api/v1/admin/nodes/{name}/deactivate
///
/// Running jobs on the node keep running; the node only stops counting
/// toward the least-loaded comparison.
pub async fn deactivate_node(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let node = state.coordinator.set_active(&name, false).await?;
    tracing::info!(node_name = %name, admin_id = admin.user_id, "Node deactivated by admin");
    Ok(Json(DataResponse { data: node }))
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/jobs?limit=
pub async fn list_jobs(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<JobListParams>,
) -> AppResult<impl IntoResponse> {
    let jobs = state.coordinator.list_jobs(params.limit).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/admin/jobs/{id}/locks
pub async fn job_locks(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let locks = state.coordinator.job_locks(job_id).await?;
    Ok(Json(DataResponse { data: locks }))
}

/// GET /api/v1/admin/summary
pub async fn summary(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let summary = state.coordinator.summary().await?;
    Ok(Json(DataResponse { data: summary }))
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/maintenance/rebalance-queued
pub async fn rebalance_queued(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let requeued = state.coordinator.rebalance_queued().await?;
    tracing::info!(requeued, admin_id = admin.user_id, "Rebalance triggered by admin");
    Ok(Json(DataResponse {
        data: RebalanceResponse { requeued },
    }))
}
