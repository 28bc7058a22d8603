//! Formatted local time.

use crate::config::ClockConfig;
use crate::error::CollectError;
use crate::metrics::data::{MetricId, MetricValue};
use crate::metrics::traits::Collector;
use chrono::Local;
use std::time::Duration;

pub struct ClockCollector {
    interval: Duration,
    format: String,
}

impl ClockCollector {
    pub fn new(config: &ClockConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
            format: config.format.clone(),
        }
    }
}

impl Collector for ClockCollector {
    fn id(&self) -> MetricId {
        MetricId::Clock
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn sample(&mut self) -> Result<MetricValue, CollectError> {
        Ok(MetricValue::Text {
            text: Local::now().format(&self.format).to_string(),
        })
    }
}
