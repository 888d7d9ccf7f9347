//! Admission control: may this node take work right now?
//!
//! Evaluated fresh on every claim attempt, before the node contends for a
//! job row. Two gates apply in order:
//!
//! 1. The node must not be overloaded.
//! 2. If any node is active for scheduling, the caller's score must be
//!    within `epsilon` of the minimum score across that active set.

use serde::Serialize;

use crate::liveness::is_active_for_scheduling;
use crate::load::{min_score, LoadSample};
use crate::types::{DbId, Timestamp};

/// Default tie tolerance between near-equal scores.
pub const DEFAULT_SCORE_EPSILON: f64 = 1e-3;

/// What admission needs to know about one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeView {
    pub id: DbId,
    pub is_active: bool,
    pub last_seen: Option<Timestamp>,
    pub load: LoadSample,
}

impl NodeView {
    pub fn score(&self) -> f64 {
        self.load.score()
    }

    pub fn is_overloaded(&self) -> bool {
        self.load.is_overloaded()
    }
}

/// Tunables for the admission decision.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionPolicy {
    pub stale_window: chrono::Duration,
    pub epsilon: f64,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            stale_window: chrono::Duration::seconds(crate::liveness::DEFAULT_STALE_WINDOW_SECS),
            epsilon: DEFAULT_SCORE_EPSILON,
        }
    }
}

/// Why a node was turned away. Workers treat any rejection like an empty
/// queue and poll again later.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum Rejection {
    Overloaded { score: f64 },
    NotLeastLoaded { score: f64, min_score: f64 },
}

impl Rejection {
    /// Wire label of the rejection.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::Overloaded { .. } => "overloaded",
            Rejection::NotLeastLoaded { .. } => "not-least-loaded",
        }
    }

    pub fn score(&self) -> f64 {
        match *self {
            Rejection::Overloaded { score } | Rejection::NotLeastLoaded { score, .. } => score,
        }
    }

    pub fn min_score(&self) -> Option<f64> {
        match *self {
            Rejection::Overloaded { .. } => None,
            Rejection::NotLeastLoaded { min_score, .. } => Some(min_score),
        }
    }
}

/// Gate 1: an overloaded node must not request work.
pub fn check_overload(candidate: &NodeView) -> Result<(), Rejection> {
    if candidate.is_overloaded() {
        Err(Rejection::Overloaded {
            score: candidate.score(),
        })
    } else {
        Ok(())
    }
}

/// The subset of `nodes` that is active for scheduling at `now`.
pub fn active_set<'a>(
    nodes: &'a [NodeView],
    now: Timestamp,
    policy: &AdmissionPolicy,
) -> impl Iterator<Item = &'a NodeView> + 'a {
    let window = policy.stale_window;
    nodes
        .iter()
        .filter(move |n| is_active_for_scheduling(n.is_active, n.last_seen, now, window))
}

/// Gate 2: only nodes tied (within epsilon) for the lowest score among the
/// active set may claim. An empty active set admits everyone.
///
/// Returns the minimum active score on success, if there was one.
pub fn check_least_loaded(
    candidate: &NodeView,
    nodes: &[NodeView],
    now: Timestamp,
    policy: &AdmissionPolicy,
) -> Result<Option<f64>, Rejection> {
    let loads: Vec<LoadSample> = active_set(nodes, now, policy).map(|n| n.load).collect();
    let Some(min) = min_score(&loads) else {
        return Ok(None);
    };

    let score = candidate.score();
    if score > min + policy.epsilon {
        return Err(Rejection::NotLeastLoaded {
            score,
            min_score: min,
        });
    }
    Ok(Some(min))
}

/// Ids of administratively active nodes that are currently overloaded.
///
/// Queued jobs pinned to these nodes are released by the reclaim sweep
/// and the rebalancer.
pub fn overloaded_active_ids(nodes: &[NodeView]) -> Vec<DbId> {
    nodes
        .iter()
        .filter(|n| n.is_active && n.is_overloaded())
        .map(|n| n.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn node(id: DbId, cpu: f64, mem: f64, last_seen: Option<Timestamp>) -> NodeView {
        NodeView {
            id,
            is_active: true,
            last_seen,
            load: LoadSample::new(Some(cpu), Some(mem)),
        }
    }

    #[test]
    fn overloaded_node_is_rejected_even_when_alone() {
        let n = node(1, 90.0, 10.0, Some(Utc::now()));
        let rejection = check_overload(&n).unwrap_err();
        assert_eq!(rejection.reason(), "overloaded");
    }

    #[test]
    fn least_loaded_node_is_admitted() {
        let now = Utc::now();
        let a = node(1, 20.0, 20.0, Some(now));
        let b = node(2, 50.0, 50.0, Some(now));
        let nodes = [a, b];
        let min = check_least_loaded(&a, &nodes, now, &AdmissionPolicy::default()).unwrap();
        assert!((min.unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn heavier_node_is_rejected_with_scores() {
        let now = Utc::now();
        let a = node(1, 20.0, 20.0, Some(now));
        let b = node(2, 50.0, 50.0, Some(now));
        let nodes = [a, b];
        let rejection = check_least_loaded(&b, &nodes, now, &AdmissionPolicy::default())
            .unwrap_err();
        assert_eq!(rejection.reason(), "not-least-loaded");
        assert!((rejection.score() - 50.0).abs() < 1e-9);
        assert!((rejection.min_score().unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn near_tie_within_epsilon_is_admitted() {
        let now = Utc::now();
        let a = node(1, 20.0, 20.0, Some(now));
        let b = node(2, 20.0, 20.001, Some(now)); // +0.0004
        let nodes = [a, b];
        assert!(check_least_loaded(&b, &nodes, now, &AdmissionPolicy::default()).is_ok());
    }

    #[test]
    fn stale_nodes_do_not_set_the_minimum() {
        let now = Utc::now();
        let stale = node(1, 0.0, 0.0, Some(now - Duration::seconds(60)));
        let fresh = node(2, 40.0, 40.0, Some(now));
        let nodes = [stale, fresh];
        assert!(check_least_loaded(&fresh, &nodes, now, &AdmissionPolicy::default()).is_ok());
    }

    #[test]
    fn empty_active_set_admits_anyone() {
        let now = Utc::now();
        let stale = node(1, 40.0, 40.0, Some(now - Duration::seconds(60)));
        let nodes = [stale];
        assert_eq!(
            check_least_loaded(&stale, &nodes, now, &AdmissionPolicy::default()).unwrap(),
            None
        );
    }

    #[test]
    fn overloaded_active_ids_skips_disabled_nodes() {
        let now = Utc::now();
        let mut disabled = node(1, 95.0, 10.0, Some(now));
        disabled.is_active = false;
        let hot = node(2, 10.0, 95.0, Some(now));
        let cool = node(3, 10.0, 10.0, Some(now));
        assert_eq!(overloaded_active_ids(&[disabled, hot, cool]), vec![2]);
    }

    #[test]
    fn rejection_serializes_with_reason_tag() {
        let json = serde_json::to_value(Rejection::NotLeastLoaded {
            score: 50.0,
            min_score: 20.0,
        })
        .unwrap();
        assert_eq!(json["reason"], "not-least-loaded");
        assert_eq!(json["min_score"], 20.0);
    }
}
