//! Service configuration.
//!
//! Every recognized option has a default, so an empty or absent config
//! file yields a fully working service. The file format is JSON; unknown
//! keys are rejected to catch typos early.

use crate::error::{Result, ServiceError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base scheduler tick in milliseconds. All collector intervals are
    /// multiples of roughly this granularity.
    pub tick_ms: u64,
    /// Full-snapshot heartbeat period in seconds.
    pub heartbeat_secs: u64,
    /// Consecutive transient failures before a metric is marked degraded.
    pub degraded_threshold: u32,
    /// Deadline for one blocking collector invocation, in milliseconds.
    pub collector_timeout_ms: u64,
    pub cpu: CpuConfig,
    pub memory: MemoryConfig,
    pub disk: DiskConfig,
    pub network: NetworkConfig,
    pub temperature: TemperatureConfig,
    pub battery: BatteryConfig,
    pub volume: VolumeConfig,
    pub workspace: WorkspaceConfig,
    pub clock: ClockConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CpuConfig {
    pub interval_secs: u64,
    /// Minimum utilization move, in percentage points, worth publishing.
    pub change_threshold_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemoryConfig {
    pub interval_secs: u64,
    pub change_threshold_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiskConfig {
    pub interval_secs: u64,
    /// Mount points to report, in output order.
    pub mount_points: Vec<String>,
    pub change_threshold_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    pub interval_secs: u64,
    /// Minimum combined rate move, in bytes per second, worth publishing.
    pub change_threshold_bytes_per_sec: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemperatureConfig {
    pub interval_secs: u64,
    /// Extra sensor paths tried before the built-in candidates.
    pub sensor_paths: Vec<String>,
    pub change_threshold_celsius: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VolumeConfig {
    pub interval_secs: u64,
    /// Mixer query command; stdout is parsed for level and mute flag.
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceConfig {
    pub interval_secs: u64,
    /// Window-manager IPC query; stdout yields the workspace identifier.
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClockConfig {
    pub interval_secs: u64,
    /// strftime pattern for the displayed time.
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_ms: crate::DEFAULT_TICK_MS,
            heartbeat_secs: crate::DEFAULT_HEARTBEAT_SECS,
            degraded_threshold: 3,
            collector_timeout_ms: 2_000,
            cpu: CpuConfig::default(),
            memory: MemoryConfig::default(),
            disk: DiskConfig::default(),
            network: NetworkConfig::default(),
            temperature: TemperatureConfig::default(),
            battery: BatteryConfig::default(),
            volume: VolumeConfig::default(),
            workspace: WorkspaceConfig::default(),
            clock: ClockConfig::default(),
        }
    }
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            interval_secs: 2,
            change_threshold_percent: 1.0,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            change_threshold_percent: 1.0,
        }
    }
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            mount_points: vec!["/".to_string()],
            change_threshold_percent: 0.5,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            interval_secs: 2,
            change_threshold_bytes_per_sec: 10 * 1024,
        }
    }
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            sensor_paths: Vec::new(),
            change_threshold_celsius: 1.0,
        }
    }
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            interval_secs: 2,
            command: vec![
                "wpctl".to_string(),
                "get-volume".to_string(),
                "@DEFAULT_AUDIO_SINK@".to_string(),
            ],
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1,
            command: vec![
                "hyprctl".to_string(),
                "activeworkspace".to_string(),
                "-j".to_string(),
            ],
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1,
            format: "%H:%M".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from an optional JSON file, falling back to
    /// defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    ServiceError::config_error(format!(
                        "cannot read {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                serde_json::from_str(&text).map_err(|e| {
                    ServiceError::config_error(format!(
                        "invalid config {}: {}",
                        path.display(),
                        e
                    ))
                })?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            return Err(ServiceError::config_error("tick_ms must be positive"));
        }
        if self.heartbeat_secs == 0 {
            return Err(ServiceError::config_error(
                "heartbeat_secs must be positive",
            ));
        }
        if self.degraded_threshold == 0 {
            return Err(ServiceError::config_error(
                "degraded_threshold must be positive",
            ));
        }
        let intervals = [
            ("cpu", self.cpu.interval_secs),
            ("memory", self.memory.interval_secs),
            ("disk", self.disk.interval_secs),
            ("network", self.network.interval_secs),
            ("temperature", self.temperature.interval_secs),
            ("battery", self.battery.interval_secs),
            ("volume", self.volume.interval_secs),
            ("workspace", self.workspace.interval_secs),
            ("clock", self.clock.interval_secs),
        ];
        for (name, interval) in intervals {
            if interval == 0 {
                return Err(ServiceError::config_error(format!(
                    "{name}.interval_secs must be positive"
                )));
            }
        }
        if self.disk.mount_points.is_empty() {
            return Err(ServiceError::config_error(
                "disk.mount_points must not be empty",
            ));
        }
        if self.volume.command.is_empty() || self.workspace.command.is_empty() {
            return Err(ServiceError::config_error(
                "volume.command and workspace.command must not be empty",
            ));
        }
        Ok(())
    }
}
