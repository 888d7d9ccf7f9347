//! Host metrics sampled through `sysinfo`.
//!
//! [`MetricsCollector`] keeps one [`System`] and one [`Networks`] handle
//! alive between samples. CPU usage is the busy share since the previous
//! sample, and network counters are reported as bytes moved since the
//! collector was created.
//!
//! On platforms `sysinfo` does not support every metric is `None` and the
//! coordinator keeps whatever it stored last.

use serde::Serialize;
use sysinfo::{Networks, System};

/// One heartbeat's worth of host metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HostSample {
    pub cpu_pct: Option<f64>,
    pub mem_pct: Option<f64>,
    pub net_in: Option<i64>,
    pub net_out: Option<i64>,
}

/// Byte counters summed over every interface except loopback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// `used / total` as a percentage in `0..=100`, or `None` for an empty
/// total.
pub fn used_percent(used: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some((used.min(total) as f64 / total as f64 * 100.0).clamp(0.0, 100.0))
}

/// Linux `lo`, BSD/macOS `lo0`, Windows `Loopback Pseudo-Interface N`.
pub fn is_loopback(interface: &str) -> bool {
    interface == "lo" || interface.starts_with("lo0") || interface.starts_with("Loopback")
}

/// Sum `(interface, rx, tx)` totals, skipping loopback. `None` when no
/// other interface exists.
pub fn sum_counters<'a, I>(interfaces: I) -> Option<NetCounters>
where
    I: IntoIterator<Item = (&'a str, u64, u64)>,
{
    let mut counters = NetCounters::default();
    let mut seen = false;

    for (name, rx, tx) in interfaces {
        if is_loopback(name) {
            continue;
        }
        counters.rx_bytes = counters.rx_bytes.saturating_add(rx);
        counters.tx_bytes = counters.tx_bytes.saturating_add(tx);
        seen = true;
    }

    seen.then_some(counters)
}

/// Bytes moved since `baseline`, as the signed counters the heartbeat
/// carries. A counter that went backwards (interface reset) reads as 0.
pub fn counters_since(baseline: NetCounters, current: NetCounters) -> (Option<i64>, Option<i64>) {
    (
        i64::try_from(current.rx_bytes.saturating_sub(baseline.rx_bytes)).ok(),
        i64::try_from(current.tx_bytes.saturating_sub(baseline.tx_bytes)).ok(),
    )
}

/// Stateful host sampler.
pub struct MetricsCollector {
    system: System,
    networks: Networks,
    net_baseline: Option<NetCounters>,
    supported: bool,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    /// Take the first CPU reading and the network baseline, so the first
    /// [`sample`](Self::sample) already reports deltas.
    pub fn new() -> Self {
        let supported = sysinfo::IS_SUPPORTED_SYSTEM;
        if !supported {
            tracing::warn!("Host metrics unavailable on this platform, heartbeats will carry no data");
        }

        let mut system = System::new();
        system.refresh_cpu_usage();

        let networks = Networks::new_with_refreshed_list();
        let net_baseline = sum_counters(totals(&networks));

        Self {
            system,
            networks,
            net_baseline,
            supported,
        }
    }

    /// A collector whose samples are always empty. Heartbeats still keep
    /// the node alive but never change its stored metrics.
    pub fn disabled() -> Self {
        Self {
            system: System::new(),
            networks: Networks::new(),
            net_baseline: None,
            supported: false,
        }
    }

    /// Take one sample. Metrics that cannot be read are `None`.
    pub fn sample(&mut self) -> HostSample {
        if !self.supported {
            return HostSample::default();
        }

        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        self.networks.refresh(true);

        let cpu = self.system.global_cpu_usage();
        let cpu_pct = (!self.system.cpus().is_empty() && cpu.is_finite())
            .then(|| f64::from(cpu).clamp(0.0, 100.0));

        let total = self.system.total_memory();
        let mem_pct = used_percent(total.saturating_sub(self.system.available_memory()), total);

        let (net_in, net_out) = match (self.net_baseline, sum_counters(totals(&self.networks))) {
            (Some(base), Some(cur)) => counters_since(base, cur),
            (None, Some(cur)) => {
                // An interface came up after start; count from here.
                self.net_baseline = Some(cur);
                (Some(0), Some(0))
            }
            _ => (None, None),
        };

        HostSample {
            cpu_pct,
            mem_pct,
            net_in,
            net_out,
        }
    }
}

fn totals(networks: &Networks) -> impl Iterator<Item = (&str, u64, u64)> {
    networks
        .iter()
        .map(|(name, data)| (name.as_str(), data.total_received(), data.total_transmitted()))
}
