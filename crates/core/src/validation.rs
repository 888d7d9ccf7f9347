//! Input validation and normalisation for node and job fields.

use crate::error::CoreError;

/// Maximum length of a node name.
pub const MAX_NODE_NAME_LEN: usize = 128;

/// Maximum length of a job type.
pub const MAX_JOB_TYPE_LEN: usize = 64;

/// Maximum number of characters stored in a failed job's `error`.
pub const MAX_ERROR_CHARS: usize = 8000;

/// Maximum number of jobs returned by a listing.
pub const MAX_JOB_LIST_LIMIT: i64 = 200;

/// Default number of jobs returned by a listing.
pub const DEFAULT_JOB_LIST_LIMIT: i64 = 50;

/// Validate a node name.
///
/// Rules:
/// - Must not be empty.
/// - Must not exceed `MAX_NODE_NAME_LEN` characters.
/// - Must contain only alphanumeric, hyphen, underscore, or dot characters.
pub fn validate_node_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::Validation(
            "Node name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_NODE_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Node name must not exceed {MAX_NODE_NAME_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(CoreError::Validation(
            "Node name may only contain alphanumeric, hyphen, underscore, or dot characters"
                .to_string(),
        ));
    }
    Ok(())
}

/// Validate a job type descriptor (opaque to the coordinator).
pub fn validate_job_type(job_type: &str) -> Result<(), CoreError> {
    if job_type.trim().is_empty() {
        return Err(CoreError::Validation(
            "Job type must not be empty".to_string(),
        ));
    }
    if job_type.chars().count() > MAX_JOB_TYPE_LEN {
        return Err(CoreError::Validation(format!(
            "Job type must not exceed {MAX_JOB_TYPE_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate a reported utilisation percentage.
pub fn validate_percentage(field: &str, value: Option<f64>) -> Result<(), CoreError> {
    match value {
        Some(v) if !v.is_finite() || !(0.0..=100.0).contains(&v) => Err(CoreError::Validation(
            format!("{field} must be between 0 and 100"),
        )),
        _ => Ok(()),
    }
}

/// Validate a reported byte counter.
pub fn validate_counter(field: &str, value: Option<i64>) -> Result<(), CoreError> {
    match value {
        Some(v) if v < 0 => Err(CoreError::Validation(format!(
            "{field} must not be negative"
        ))),
        _ => Ok(()),
    }
}

/// Clamp a reported progress value into `[0, 100]`.
///
/// NaN carries no information and is rejected rather than guessed at.
pub fn clamp_progress(value: f64) -> Result<f64, CoreError> {
    if value.is_nan() {
        return Err(CoreError::Validation(
            "Progress must be a number".to_string(),
        ));
    }
    Ok(value.clamp(0.0, 100.0))
}

/// Truncate a failure message to at most `MAX_ERROR_CHARS` characters,
/// never splitting a UTF-8 sequence.
pub fn truncate_error(error: &str) -> String {
    match error.char_indices().nth(MAX_ERROR_CHARS) {
        Some((byte_idx, _)) => error[..byte_idx].to_string(),
        None => error.to_string(),
    }
}

/// Clamp a requested listing size into `[1, MAX_JOB_LIST_LIMIT]`.
pub fn clamp_list_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_JOB_LIST_LIMIT)
        .clamp(1, MAX_JOB_LIST_LIMIT)
}
