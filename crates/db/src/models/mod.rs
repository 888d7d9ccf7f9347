pub mod job;
pub mod job_lock;
pub mod node;
