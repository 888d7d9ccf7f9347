use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Node not registered: {name}")]
    NodeNotRegistered { name: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a missing job.
    pub fn job_not_found(id: DbId) -> Self {
        CoreError::NotFound { entity: "Job", id }
    }

    /// Shorthand for an unknown node name.
    pub fn node_not_registered(name: &str) -> Self {
        CoreError::NodeNotRegistered {
            name: name.to_string(),
        }
    }
}
