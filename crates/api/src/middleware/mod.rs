//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the caller from a JWT Bearer token.
//! - [`rbac::RequireAdmin`] -- Requires the `admin` role.
//! - [`rbac::RequireCreator`] -- Requires `creator` or `admin` role.
//! - [`rbac::RequireAuth`] -- Requires any authenticated caller.
//!
//! Worker-facing routes (`/nodes`, `/worker`) take no token.

pub mod auth;
pub mod rbac;
