//! PostgreSQL repositories, one per table.
//!
//! Every repo is a zero-sized struct with associated async functions taking
//! the pool (or an open transaction) as their first argument.

pub mod job_lock_repo;
pub mod job_repo;
pub mod node_repo;

pub use job_lock_repo::JobLockRepo;
pub use job_repo::JobRepo;
pub use node_repo::NodeRepo;
