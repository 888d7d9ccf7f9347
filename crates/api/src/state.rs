use std::sync::Arc;

use mediaq_scheduler::Coordinator;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: the coordinator holds its store and clock behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Node registry, claim protocol and job lifecycle.
    pub coordinator: Coordinator,
    /// Server configuration (JWT settings are read by the auth extractors).
    pub config: Arc<ServerConfig>,
}
