//! The mediaq coordinator: node registry, heartbeat intake, admission
//! control, the job claim protocol and the rebalancer.
//!
//! [`Coordinator`] is purely reactive. It owns no background loop; every
//! decision happens inside a call from a worker or an operator.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod views;

pub use config::SchedulerConfig;
pub use coordinator::Coordinator;
pub use error::SchedulerError;
pub use views::{ClaimOutcome, JobSummary, NodeStatus, NodeSummary, Summary};
