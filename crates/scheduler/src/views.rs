//! Read models returned by the coordinator.

use mediaq_core::admission::Rejection;
use mediaq_db::models::job::{ClaimedJob, JobCounts};
use mediaq_db::models::node::Node;
use serde::Serialize;

/// Result of a claim attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    /// The node won a job.
    Claimed(ClaimedJob),
    /// The node was admitted but nothing is queued.
    Empty,
    /// Admission turned the node away; it should poll again later.
    Rejected(Rejection),
}

impl ClaimOutcome {
    pub fn job(&self) -> Option<&ClaimedJob> {
        match self {
            ClaimOutcome::Claimed(job) => Some(job),
            _ => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            ClaimOutcome::Rejected(r) => Some(r),
            _ => None,
        }
    }
}

/// A node together with its derived load state.
#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    #[serde(flatten)]
    pub node: Node,
    pub score: f64,
    pub overloaded: bool,
    pub stale: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub total: i64,
    pub by_status: JobCounts,
}

/// Aggregate over administratively active nodes.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub count: usize,
    /// `None` when no node is active.
    pub least_score: Option<f64>,
    /// How many of the active nodes are overloaded.
    pub overloaded: usize,
    pub items: Vec<NodeStatus>,
}

/// Cluster overview for operators.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub jobs: JobSummary,
    pub nodes: NodeSummary,
}
