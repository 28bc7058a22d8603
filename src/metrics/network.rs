//! Network throughput from `/proc/net/dev` counter deltas.

use crate::config::NetworkConfig;
use crate::error::CollectError;
use crate::metrics::data::{MetricId, MetricValue};
use crate::metrics::traits::{ChangeFn, Collector};
use std::collections::HashMap;
use std::time::{Duration, Instant};

const NET_DEV_PATH: &str = "/proc/net/dev";

/// Cumulative byte counters for one interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NetCounters {
    pub rx: u64,
    pub tx: u64,
}

pub struct NetworkCollector {
    interval: Duration,
    threshold_bps: u64,
    prev: HashMap<String, NetCounters>,
    last_sample: Option<Instant>,
}

impl NetworkCollector {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
            threshold_bps: config.change_threshold_bytes_per_sec,
            prev: HashMap::new(),
            last_sample: None,
        }
    }
}

impl Collector for NetworkCollector {
    fn id(&self) -> MetricId {
        MetricId::Network
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn sample(&mut self) -> Result<MetricValue, CollectError> {
        let now = Instant::now();
        let net_dev = std::fs::read_to_string(NET_DEV_PATH)?;
        let current = parse_net_dev(&net_dev);
        let elapsed = self
            .last_sample
            .map(|last| now.duration_since(last).as_secs_f64());
        self.last_sample = Some(now);

        let result = throughput(&self.prev, &current, elapsed);
        self.prev = current;
        result
    }

    fn change_predicate(&self) -> ChangeFn {
        let threshold = self.threshold_bps;
        Box::new(move |old, new| {
            if !old.same_kind(new) {
                return true;
            }
            match (old, new) {
                (
                    MetricValue::Throughput {
                        rx_bytes_per_sec: old_rx,
                        tx_bytes_per_sec: old_tx,
                    },
                    MetricValue::Throughput {
                        rx_bytes_per_sec: new_rx,
                        tx_bytes_per_sec: new_tx,
                    },
                ) => {
                    old_rx.abs_diff(*new_rx) + old_tx.abs_diff(*new_tx) >= threshold
                }
                _ => old != new,
            }
        })
    }
}

/// Parse per-interface rx/tx byte counters, skipping loopback and virtual
/// interfaces the way the bar is expected to.
pub(crate) fn parse_net_dev(net_dev: &str) -> HashMap<String, NetCounters> {
    let mut counters = HashMap::new();
    // First two lines are headers.
    for line in net_dev.lines().skip(2) {
        let Some((iface, rest)) = line.split_once(':') else {
            continue;
        };
        let iface = iface.trim();
        if iface.is_empty() || is_virtual_interface(iface) {
            continue;
        }
        let fields: Vec<&str> = rest.split_whitespace().collect();
        // rx bytes is field 0, tx bytes is field 8.
        let (Some(rx), Some(tx)) = (
            fields.first().and_then(|f| f.parse().ok()),
            fields.get(8).and_then(|f| f.parse().ok()),
        ) else {
            continue;
        };
        counters.insert(iface.to_string(), NetCounters { rx, tx });
    }
    counters
}

fn is_virtual_interface(iface: &str) -> bool {
    iface == "lo" || iface.starts_with("docker") || iface.starts_with("veth")
}

/// Sum counter deltas across interfaces into a combined rate. A decreasing
/// counter (interface restart) invalidates the whole interval: the caller
/// rebaselines and no rate is reported, rather than a huge negative one.
pub(crate) fn throughput(
    prev: &HashMap<String, NetCounters>,
    current: &HashMap<String, NetCounters>,
    elapsed: Option<f64>,
) -> Result<MetricValue, CollectError> {
    let Some(elapsed) = elapsed else {
        return Ok(MetricValue::Pending);
    };
    if elapsed <= 0.0 {
        return Ok(MetricValue::Pending);
    }

    let mut rx_delta = 0u64;
    let mut tx_delta = 0u64;
    for (iface, now) in current {
        let Some(before) = prev.get(iface) else {
            // Interface appeared mid-run; its first interval has no delta.
            continue;
        };
        if now.rx < before.rx || now.tx < before.tx {
            return Err(CollectError::CounterReset);
        }
        rx_delta += now.rx - before.rx;
        tx_delta += now.tx - before.tx;
    }

    Ok(MetricValue::Throughput {
        rx_bytes_per_sec: (rx_delta as f64 / elapsed).round() as u64,
        tx_bytes_per_sec: (tx_delta as f64 / elapsed).round() as u64,
    })
}
