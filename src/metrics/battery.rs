//! Battery charge and charging state from `/sys/class/power_supply`.
//!
//! "No battery" is a valid terminal state for desktops, reported as
//! permanently unavailable rather than a failure.

use crate::config::BatteryConfig;
use crate::error::CollectError;
use crate::metrics::data::{BatteryState, MetricId, MetricValue};
use crate::metrics::traits::Collector;
use std::path::{Path, PathBuf};
use std::time::Duration;

const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";

pub struct BatteryCollector {
    interval: Duration,
    /// Battery directory found on a previous sample.
    resolved: Option<PathBuf>,
}

impl BatteryCollector {
    pub fn new(config: &BatteryConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
            resolved: None,
        }
    }

    fn find_battery(&self) -> Option<PathBuf> {
        let entries = std::fs::read_dir(POWER_SUPPLY_DIR).ok()?;
        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(kind) = std::fs::read_to_string(path.join("type")) else {
                continue;
            };
            if kind.trim() == "Battery" {
                return Some(path);
            }
        }
        None
    }
}

impl Collector for BatteryCollector {
    fn id(&self) -> MetricId {
        MetricId::Battery
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn sample(&mut self) -> Result<MetricValue, CollectError> {
        if self.resolved.is_none() {
            self.resolved = self.find_battery();
        }
        let Some(battery) = self.resolved.clone() else {
            return Err(CollectError::unavailable("no battery present"));
        };
        match read_battery(&battery) {
            Ok(value) => Ok(value),
            Err(err) => {
                // The battery may have been removed; re-probe next time.
                self.resolved = None;
                Err(err)
            }
        }
    }
}

fn read_battery(dir: &Path) -> Result<MetricValue, CollectError> {
    let capacity = std::fs::read_to_string(dir.join("capacity"))?;
    let status = std::fs::read_to_string(dir.join("status"))?;
    let percent = parse_capacity(&capacity)?;
    let state = parse_status(&status);
    Ok(MetricValue::Battery { percent, state })
}

pub(crate) fn parse_capacity(content: &str) -> Result<u8, CollectError> {
    let raw: u32 = content
        .trim()
        .parse()
        .map_err(|e| CollectError::parse_error(format!("bad battery capacity: {e}")))?;
    Ok(raw.min(100) as u8)
}

/// Kernel status strings beyond Charging/Discharging ("Full", "Not
/// charging", "Unknown") all mean the battery is not draining.
pub(crate) fn parse_status(content: &str) -> BatteryState {
    match content.trim() {
        "Charging" => BatteryState::Charging,
        "Discharging" => BatteryState::Discharging,
        _ => BatteryState::Full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_capacity_trims_and_clamps() {
        assert_eq!(parse_capacity("85\n").unwrap(), 85);
        assert_eq!(parse_capacity("100").unwrap(), 100);
        // Some firmware briefly reports >100 near full charge.
        assert_eq!(parse_capacity("103\n").unwrap(), 100);
    }

    #[test]
    fn parse_capacity_rejects_garbage() {
        assert!(parse_capacity("charging").is_err());
        assert!(parse_capacity("").is_err());
    }

    #[test]
    fn parse_status_maps_kernel_strings() {
        assert_eq!(parse_status("Charging\n"), BatteryState::Charging);
        assert_eq!(parse_status("Discharging\n"), BatteryState::Discharging);
        assert_eq!(parse_status("Full\n"), BatteryState::Full);
        assert_eq!(parse_status("Not charging\n"), BatteryState::Full);
        assert_eq!(parse_status("Unknown"), BatteryState::Full);
    }

    #[test]
    fn any_change_is_significant_by_default() {
        let collector = BatteryCollector::new(&BatteryConfig { interval_secs: 30 });
        let change = collector.change_predicate();
        let a = MetricValue::Battery {
            percent: 80,
            state: BatteryState::Discharging,
        };
        let b = MetricValue::Battery {
            percent: 79,
            state: BatteryState::Discharging,
        };
        assert!(change(&a, &b));
        assert!(!change(&a, &a.clone()));
    }
}
