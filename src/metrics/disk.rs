//! Filesystem usage for configured mount points, via `sysinfo`.

use crate::config::DiskConfig;
use crate::error::CollectError;
use crate::metrics::data::{MetricId, MetricValue, MountUsage};
use crate::metrics::traits::{ChangeFn, Collector};
use std::time::Duration;
use sysinfo::Disks;

pub struct DiskCollector {
    interval: Duration,
    mount_points: Vec<String>,
    threshold: f64,
}

impl DiskCollector {
    pub fn new(config: &DiskConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
            mount_points: config.mount_points.clone(),
            threshold: config.change_threshold_percent,
        }
    }
}

impl Collector for DiskCollector {
    fn id(&self) -> MetricId {
        MetricId::Disk
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn blocking(&self) -> bool {
        // Refreshing the disk list stats every mounted filesystem.
        true
    }

    fn sample(&mut self) -> Result<MetricValue, CollectError> {
        let disks = Disks::new_with_refreshed_list();
        let mut mounts = Vec::with_capacity(self.mount_points.len());
        for mount_point in &self.mount_points {
            let found = disks
                .iter()
                .find(|disk| disk.mount_point().to_string_lossy() == *mount_point);
            if let Some(disk) = found {
                mounts.push(mount_usage(
                    mount_point,
                    disk.total_space(),
                    disk.available_space(),
                ));
            }
        }
        if mounts.is_empty() {
            return Err(CollectError::unavailable(format!(
                "no configured mount point resolvable: {:?}",
                self.mount_points
            )));
        }
        Ok(MetricValue::DiskUsage { mounts })
    }

    fn change_predicate(&self) -> ChangeFn {
        let threshold = self.threshold;
        Box::new(move |old, new| {
            if !old.same_kind(new) {
                return true;
            }
            match (old, new) {
                (
                    MetricValue::DiskUsage { mounts: old_mounts },
                    MetricValue::DiskUsage { mounts: new_mounts },
                ) => disk_usage_changed(old_mounts, new_mounts, threshold),
                _ => old != new,
            }
        })
    }
}

pub(crate) fn mount_usage(mount_point: &str, total: u64, available: u64) -> MountUsage {
    let used = total.saturating_sub(available);
    let percent = if total > 0 {
        used as f64 * 100.0 / total as f64
    } else {
        0.0
    };
    MountUsage {
        mount_point: mount_point.to_string(),
        used_bytes: used,
        total_bytes: total,
        percent,
    }
}

/// Significant when the set of mounts changed or any mount moved by at
/// least `threshold` percentage points.
pub(crate) fn disk_usage_changed(old: &[MountUsage], new: &[MountUsage], threshold: f64) -> bool {
    if old.len() != new.len() {
        return true;
    }
    old.iter().zip(new).any(|(a, b)| {
        a.mount_point != b.mount_point || (a.percent - b.percent).abs() >= threshold
    })
}
