//! Handlers for node registration and heartbeats.
//!
//! Called by node agents; no bearer token is required.

use axum::extract::State;
use axum::Json;
use mediaq_db::models::node::{Heartbeat, Node, RegisterNode};

use crate::error::AppResult;
use crate::extract::JsonBody;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/nodes/register
///
/// Idempotent: re-registering a name returns the existing node.
pub async fn register_node(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<RegisterNode>,
) -> AppResult<Json<DataResponse<Node>>> {
    let node = state.coordinator.register(&input).await?;
    Ok(Json(DataResponse { data: node }))
}

/// POST /api/v1/nodes/heartbeat
pub async fn heartbeat(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<Heartbeat>,
) -> AppResult<Json<DataResponse<Node>>> {
    let node = state.coordinator.record_heartbeat(&input).await?;
    Ok(Json(DataResponse { data: node }))
}
