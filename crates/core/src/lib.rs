//! Pure domain rules for the mediaq coordinator.
//!
//! Nothing in this crate performs I/O. The storage layer (`mediaq-db`)
//! and the coordinator service (`mediaq-scheduler`) build on these types
//! and functions.

pub mod admission;
pub mod clock;
pub mod error;
pub mod liveness;
pub mod load;
pub mod roles;
pub mod status;
pub mod types;
pub mod validation;
