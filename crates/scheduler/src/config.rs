use mediaq_core::admission::{AdmissionPolicy, DEFAULT_SCORE_EPSILON};
use mediaq_core::liveness::DEFAULT_STALE_WINDOW_SECS;

/// Tunables for admission control, loaded from environment variables.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Seconds after the last heartbeat before a node is stale (default: `10`).
    pub stale_window_secs: i64,
    /// Tie tolerance between near-equal load scores (default: `0.001`).
    pub score_epsilon: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            stale_window_secs: DEFAULT_STALE_WINDOW_SECS,
            score_epsilon: DEFAULT_SCORE_EPSILON,
        }
    }
}

impl SchedulerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var             | Default |
    /// |---------------------|---------|
    /// | `STALE_WINDOW_SECS` | `10`    |
    /// | `SCORE_EPSILON`     | `0.001` |
    pub fn from_env() -> Self {
        let stale_window_secs: i64 = std::env::var("STALE_WINDOW_SECS")
            .unwrap_or_else(|_| DEFAULT_STALE_WINDOW_SECS.to_string())
            .parse()
            .expect("STALE_WINDOW_SECS must be a valid i64");

        let score_epsilon: f64 = std::env::var("SCORE_EPSILON")
            .unwrap_or_else(|_| DEFAULT_SCORE_EPSILON.to_string())
            .parse()
            .expect("SCORE_EPSILON must be a valid f64");

        Self {
            stale_window_secs,
            score_epsilon,
        }
    }

    pub fn stale_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_window_secs)
    }

    pub fn admission_policy(&self) -> AdmissionPolicy {
        AdmissionPolicy {
            stale_window: self.stale_window(),
            epsilon: self.score_epsilon,
        }
    }
}
