use mediaq_core::error::CoreError;
use mediaq_db::StoreError;

/// Failure of a coordinator operation.
///
/// Domain rule violations arrive as [`CoreError`]; backend failures as
/// [`StoreError`]. Claim contention is never reported as either.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SchedulerError {
    /// The domain error, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            SchedulerError::Core(e) => Some(e),
            SchedulerError::Store(_) => None,
        }
    }
}
