//! Metric collectors and the data they produce.
//!
//! One collector per metric family, each knowing how to take one reading,
//! how often to be invoked, and when a new value is worth publishing.

pub mod battery;
pub mod clock;
pub mod cpu;
pub mod data;
pub mod disk;
pub mod memory;
pub mod network;
pub mod temperature;
pub mod traits;
pub mod volume;
pub mod workspace;

pub use data::{
    BatteryState, Frame, MetricEntry, MetricId, MetricRecord, MetricStatus, MetricValue,
    MountUsage, Reading, SnapshotRecord,
};
pub use traits::{ChangeFn, Collector};

use crate::config::Config;

/// Build the full collector set from configuration: exactly one collector
/// per known metric.
pub fn default_collectors(config: &Config) -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(cpu::CpuCollector::new(&config.cpu)),
        Box::new(memory::MemoryCollector::new(&config.memory)),
        Box::new(disk::DiskCollector::new(&config.disk)),
        Box::new(network::NetworkCollector::new(&config.network)),
        Box::new(temperature::TemperatureCollector::new(&config.temperature)),
        Box::new(battery::BatteryCollector::new(&config.battery)),
        Box::new(volume::VolumeCollector::new(&config.volume)),
        Box::new(workspace::WorkspaceCollector::new(&config.workspace)),
        Box::new(clock::ClockCollector::new(&config.clock)),
    ]
}
