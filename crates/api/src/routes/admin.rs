use axum::routing::{get, post};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`. All require the admin role.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/nodes", get(admin::list_nodes))
        .route("/nodes/{name}/activate", post(admin::activate_node))
        .route("/nodes/{name}/deactivate", post(admin::deactivate_node))
        .route("/jobs", get(admin::list_jobs))
        .route("/jobs/{id}/locks", get(admin::job_locks))
        .route("/summary", get(admin::summary))
        .route(
            "/maintenance/rebalance-queued",
            post(admin::rebalance_queued),
        )
}
