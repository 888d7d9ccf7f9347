//! Load scoring and overload classification.
//!
//! A node's load is a single comparable number derived from its most
//! recently reported CPU and memory utilisation. Absent metrics count as
//! zero: a node that has never reported is treated as unloaded.

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Weight of CPU utilisation in the load score.
pub const LOAD_WEIGHT_CPU: f64 = 0.6;

/// Weight of memory utilisation in the load score.
pub const LOAD_WEIGHT_MEM: f64 = 0.4;

/// CPU utilisation (percent) strictly above which a node is overloaded.
pub const CPU_OVERLOAD_PCT: f64 = 85.0;

/// Memory utilisation (percent) strictly above which a node is overloaded.
pub const MEM_OVERLOAD_PCT: f64 = 80.0;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The two metrics that feed scoring, as last reported by a node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadSample {
    pub cpu_pct: Option<f64>,
    pub mem_pct: Option<f64>,
}

impl LoadSample {
    pub fn new(cpu_pct: Option<f64>, mem_pct: Option<f64>) -> Self {
        Self { cpu_pct, mem_pct }
    }

    /// See [`score`].
    pub fn score(&self) -> f64 {
        score(self.cpu_pct, self.mem_pct)
    }

    /// See [`is_overloaded`].
    pub fn is_overloaded(&self) -> bool {
        is_overloaded(self.cpu_pct, self.mem_pct)
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// `0.6 * cpu + 0.4 * mem`, with an absent metric counted as 0.
///
/// Lower is better. The result is not clamped; inputs are validated at
/// heartbeat time.
pub fn score(cpu_pct: Option<f64>, mem_pct: Option<f64>) -> f64 {
    LOAD_WEIGHT_CPU * cpu_pct.unwrap_or(0.0) + LOAD_WEIGHT_MEM * mem_pct.unwrap_or(0.0)
}

/// True if CPU is above [`CPU_OVERLOAD_PCT`] or memory is above
/// [`MEM_OVERLOAD_PCT`]. An absent metric never triggers overload.
pub fn is_overloaded(cpu_pct: Option<f64>, mem_pct: Option<f64>) -> bool {
    cpu_pct.is_some_and(|cpu| cpu > CPU_OVERLOAD_PCT)
        || mem_pct.is_some_and(|mem| mem > MEM_OVERLOAD_PCT)
}

/// Minimum score over a set of samples, or `None` if the set is empty.
pub fn min_score<'a>(samples: impl IntoIterator<Item = &'a LoadSample>) -> Option<f64> {
    samples
        .into_iter()
        .map(LoadSample::score)
        .fold(None, |acc, s| match acc {
            Some(min) if min <= s => Some(min),
            _ => Some(s),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
