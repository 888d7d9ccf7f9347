use axum::routing::post;
use axum::Router;

use crate::handlers::nodes;
use crate::state::AppState;

/// Routes mounted at `/nodes`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(nodes::register_node))
        .route("/heartbeat", post(nodes::heartbeat))
}
