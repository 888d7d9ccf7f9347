//! Well-known role name constants.
//!
//! Tokens are issued by the external identity service; these are the role
//! names it embeds in the `role` claim.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_CREATOR: &str = "creator";
pub const ROLE_VIEWER: &str = "viewer";
