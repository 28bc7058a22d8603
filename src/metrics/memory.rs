//! Memory usage from `/proc/meminfo`.
//!
//! `MemAvailable` already counts reclaimable page cache, so used memory is
//! simply total minus available.

use crate::config::MemoryConfig;
use crate::error::CollectError;
use crate::metrics::data::{MetricId, MetricValue};
use crate::metrics::traits::{scalar_change, ChangeFn, Collector};
use std::time::Duration;

const MEMINFO_PATH: &str = "/proc/meminfo";

pub struct MemoryCollector {
    interval: Duration,
    threshold: f64,
}

impl MemoryCollector {
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
            threshold: config.change_threshold_percent,
        }
    }
}

impl Collector for MemoryCollector {
    fn id(&self) -> MetricId {
        MetricId::Memory
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn sample(&mut self) -> Result<MetricValue, CollectError> {
        let meminfo = std::fs::read_to_string(MEMINFO_PATH)?;
        parse_meminfo(&meminfo)
    }

    fn change_predicate(&self) -> ChangeFn {
        scalar_change(self.threshold, |value| match value {
            MetricValue::Percent { percent } => Some(*percent),
            _ => None,
        })
    }
}

pub(crate) fn parse_meminfo(meminfo: &str) -> Result<MetricValue, CollectError> {
    let mut total_kib = None;
    let mut available_kib = None;

    for line in meminfo.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            total_kib = parse_kib(rest);
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            available_kib = parse_kib(rest);
        }
        if total_kib.is_some() && available_kib.is_some() {
            break;
        }
    }

    let total = total_kib
        .ok_or_else(|| CollectError::parse_error("MemTotal missing from /proc/meminfo"))?;
    let available = available_kib
        .ok_or_else(|| CollectError::parse_error("MemAvailable missing from /proc/meminfo"))?;
    if total == 0 {
        return Err(CollectError::parse_error("MemTotal is zero"));
    }

    let used = total.saturating_sub(available);
    Ok(MetricValue::Percent {
        percent: used as f64 * 100.0 / total as f64,
    })
}

fn parse_kib(rest: &str) -> Option<u64> {
    rest.split_whitespace().next()?.parse().ok()
}
