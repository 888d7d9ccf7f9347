use axum::routing::post;
use axum::Router;

use crate::handlers::worker;
use crate::state::AppState;

/// Routes mounted at `/worker`.
///
/// ```text
/// POST   /next-job              -> next_job
/// POST   /jobs/{id}/progress    -> report_progress
/// POST   /jobs/{id}/done        -> report_done
/// POST   /jobs/{id}/fail        -> report_fail
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/next-job", post(worker::next_job))
        .route("/jobs/{id}/progress", post(worker::report_progress))
        .route("/jobs/{id}/done", post(worker::report_done))
        .route("/jobs/{id}/fail", post(worker::report_fail))
}
