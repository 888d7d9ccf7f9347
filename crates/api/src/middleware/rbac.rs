//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects callers whose role is not in
//! the extractor's allowed set with 403 Forbidden.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use mediaq_core::error::CoreError;
use mediaq_core::roles::{ROLE_ADMIN, ROLE_CREATOR};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticate, then check the caller's role against `allowed`.
async fn authorize(
    parts: &mut Parts,
    state: &AppState,
    allowed: &[&str],
    denied_msg: &str,
) -> Result<AuthUser, AppError> {
    let user = AuthUser::from_request_parts(parts, state).await?;
    if !allowed.contains(&user.role.as_str()) {
        tracing::debug!(user_id = user.user_id, role = %user.role, "Role not permitted");
        return Err(AppError::Core(CoreError::Forbidden(denied_msg.to_string())));
    }
    Ok(user)
}

/// Operators only: node administration, listings, rebalancing.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authorize(parts, state, &[ROLE_ADMIN], "Admin role required")
            .await
            .map(RequireAdmin)
    }
}

/// May submit jobs: `creator` or `admin`.
pub struct RequireCreator(pub AuthUser);

impl FromRequestParts<AppState> for RequireCreator {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authorize(
            parts,
            state,
            &[ROLE_ADMIN, ROLE_CREATOR],
            "Creator or Admin role required",
        )
        .await
        .map(RequireCreator)
    }
}

/// Any valid token, whatever the role.
pub struct RequireAuth(pub AuthUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        AuthUser::from_request_parts(parts, state)
            .await
            .map(RequireAuth)
    }
}
