pub mod admin;
pub mod health;
pub mod jobs;
pub mod nodes;
pub mod worker;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /nodes/register                                  register (agent)
/// /nodes/heartbeat                                 heartbeat (agent)
///
/// /worker/next-job                                 claim (agent)
/// /worker/jobs/{id}/progress                       progress (agent)
/// /worker/jobs/{id}/done                           done (agent)
/// /worker/jobs/{id}/fail                           fail (agent)
///
/// /jobs                                            create (creator/admin)
/// /jobs/{id}                                       get (auth required)
///
/// /admin/nodes                                     list (admin only)
/// /admin/nodes/{name}/activate                     enable
/// /admin/nodes/{name}/deactivate                   disable
/// /admin/jobs                                      recent jobs
/// /admin/jobs/{id}/locks                           claim history
/// /admin/summary                                   cluster overview
/// /admin/maintenance/rebalance-queued              release overloaded pins
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/nodes", nodes::router())
        .nest("/worker", worker::router())
        .nest("/jobs", jobs::router())
        .nest("/admin", admin::router())
}
