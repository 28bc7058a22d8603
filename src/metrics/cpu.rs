//! CPU utilization from `/proc/stat` counter deltas.

use crate::config::CpuConfig;
use crate::error::CollectError;
use crate::metrics::data::{MetricId, MetricValue};
use crate::metrics::traits::{scalar_change, ChangeFn, Collector};
use std::time::Duration;

const PROC_STAT_PATH: &str = "/proc/stat";

/// Cumulative tick totals from the aggregate `cpu ` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CpuCounters {
    /// Ticks spent doing work (user, nice, system, irq, softirq, steal).
    pub busy: u64,
    /// Ticks spent idle or waiting for I/O.
    pub idle: u64,
}

pub struct CpuCollector {
    interval: Duration,
    threshold: f64,
    prev: Option<CpuCounters>,
}

impl CpuCollector {
    pub fn new(config: &CpuConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
            threshold: config.change_threshold_percent,
            prev: None,
        }
    }
}

impl Collector for CpuCollector {
    fn id(&self) -> MetricId {
        MetricId::Cpu
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn sample(&mut self) -> Result<MetricValue, CollectError> {
        let stat = std::fs::read_to_string(PROC_STAT_PATH)?;
        let counters = parse_proc_stat(&stat)?;
        let value = utilization(self.prev, counters);
        self.prev = Some(counters);
        Ok(value)
    }

    fn change_predicate(&self) -> ChangeFn {
        scalar_change(self.threshold, |value| match value {
            MetricValue::Percent { percent } => Some(*percent),
            _ => None,
        })
    }
}

/// Parse the aggregate `cpu ` line into busy/idle tick totals. Idle
/// includes iowait, matching how top-like tools count it.
pub(crate) fn parse_proc_stat(stat: &str) -> Result<CpuCounters, CollectError> {
    let line = stat
        .lines()
        .find(|line| line.starts_with("cpu "))
        .ok_or_else(|| CollectError::parse_error("no aggregate cpu line in /proc/stat"))?;

    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|field| {
            field
                .parse::<u64>()
                .map_err(|e| CollectError::parse_error(format!("bad cpu field {field:?}: {e}")))
        })
        .collect::<Result<_, _>>()?;

    if fields.len() < 5 {
        return Err(CollectError::parse_error(format!(
            "expected at least 5 cpu fields, got {}",
            fields.len()
        )));
    }

    // user nice system idle iowait irq softirq steal ...
    let idle = fields[3] + fields[4];
    let busy = fields.iter().sum::<u64>() - idle;
    Ok(CpuCounters { busy, idle })
}

/// Utilization over two successive counter reads. The first read after
/// startup, and any interval with no elapsed ticks, yields `Pending`
/// instead of a bogus percentage.
pub(crate) fn utilization(prev: Option<CpuCounters>, current: CpuCounters) -> MetricValue {
    let prev = match prev {
        Some(prev) => prev,
        None => return MetricValue::Pending,
    };
    let busy = current.busy.saturating_sub(prev.busy);
    let idle = current.idle.saturating_sub(prev.idle);
    let elapsed = busy + idle;
    if elapsed == 0 {
        return MetricValue::Pending;
    }
    MetricValue::Percent {
        percent: busy as f64 * 100.0 / elapsed as f64,
    }
}
