//! Thermal sensor readings from sysfs.
//!
//! Sensors are probed in a fixed candidate order; the first path that
//! yields a plausible reading wins. Machines without any resolvable sensor
//! report permanent unavailability and are retried only at the slow
//! cadence.

use crate::config::TemperatureConfig;
use crate::error::CollectError;
use crate::metrics::data::{MetricId, MetricValue};
use crate::metrics::traits::{scalar_change, ChangeFn, Collector};
use std::path::PathBuf;
use std::time::Duration;

/// Built-in probe order, most reliable CPU sensors first.
const CANDIDATE_PATHS: [&str; 5] = [
    "/sys/class/hwmon/hwmon0/temp2_input",
    "/sys/class/hwmon/hwmon0/temp1_input",
    "/sys/class/thermal/thermal_zone0/temp",
    "/sys/devices/virtual/thermal/thermal_zone0/temp",
    "/sys/class/hwmon/hwmon1/temp1_input",
];

pub struct TemperatureCollector {
    interval: Duration,
    threshold: f64,
    candidates: Vec<PathBuf>,
    /// Path that produced the last good reading; tried first afterwards.
    resolved: Option<PathBuf>,
}

impl TemperatureCollector {
    pub fn new(config: &TemperatureConfig) -> Self {
        let candidates = config
            .sensor_paths
            .iter()
            .map(PathBuf::from)
            .chain(CANDIDATE_PATHS.iter().map(PathBuf::from))
            .collect();
        Self {
            interval: Duration::from_secs(config.interval_secs),
            threshold: config.change_threshold_celsius,
            candidates,
            resolved: None,
        }
    }
}

impl Collector for TemperatureCollector {
    fn id(&self) -> MetricId {
        MetricId::Temperature
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn blocking(&self) -> bool {
        // hwmon reads can stall on flaky embedded controllers.
        true
    }

    fn sample(&mut self) -> Result<MetricValue, CollectError> {
        if let Some(path) = &self.resolved {
            if let Some(celsius) = read_sensor(path) {
                return Ok(MetricValue::Temperature { celsius });
            }
            // Sensor that worked before went away; fall through to a full
            // probe and treat a miss as transient.
            self.resolved = None;
            for path in &self.candidates {
                if let Some(celsius) = read_sensor(path) {
                    self.resolved = Some(path.clone());
                    return Ok(MetricValue::Temperature { celsius });
                }
            }
            return Err(CollectError::transient("thermal sensor stopped responding"));
        }

        for path in &self.candidates {
            if let Some(celsius) = read_sensor(path) {
                self.resolved = Some(path.clone());
                return Ok(MetricValue::Temperature { celsius });
            }
        }
        Err(CollectError::unavailable("no thermal sensor path resolves"))
    }

    fn change_predicate(&self) -> ChangeFn {
        scalar_change(self.threshold, |value| match value {
            MetricValue::Temperature { celsius } => Some(*celsius),
            _ => None,
        })
    }
}

fn read_sensor(path: &PathBuf) -> Option<f64> {
    let content = std::fs::read_to_string(path).ok()?;
    let celsius = parse_millidegrees(&content)?;
    (celsius > 0.0).then_some(celsius)
}

/// sysfs thermal files report millidegrees Celsius.
pub(crate) fn parse_millidegrees(content: &str) -> Option<f64> {
    let millidegrees: i64 = content.trim().parse().ok()?;
    Some(millidegrees as f64 / 1000.0)
}
