//! Bearer token handling. Tokens are issued by the platform's identity
//! service; this server only validates them.

pub mod jwt;
