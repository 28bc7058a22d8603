//! Data structures for metric readings and published frames.

use crate::error::CollectError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier for one metric family. Ordering fixes the key order in
/// published snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    Cpu,
    Memory,
    Disk,
    Network,
    Temperature,
    Battery,
    Volume,
    Workspace,
    Clock,
}

impl MetricId {
    /// All known metrics, in snapshot order.
    pub const ALL: [MetricId; 9] = [
        MetricId::Cpu,
        MetricId::Memory,
        MetricId::Disk,
        MetricId::Network,
        MetricId::Temperature,
        MetricId::Battery,
        MetricId::Volume,
        MetricId::Workspace,
        MetricId::Clock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricId::Cpu => "cpu",
            MetricId::Memory => "memory",
            MetricId::Disk => "disk",
            MetricId::Network => "network",
            MetricId::Temperature => "temperature",
            MetricId::Battery => "battery",
            MetricId::Volume => "volume",
            MetricId::Workspace => "workspace",
            MetricId::Clock => "clock",
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Usage of one mounted filesystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MountUsage {
    /// Mount point (e.g., "/", "/home")
    pub mount_point: String,
    /// Used space in bytes
    pub used_bytes: u64,
    /// Total space in bytes
    pub total_bytes: u64,
    /// Usage percentage (0.0 to 100.0)
    pub percent: f64,
}

/// Charging state reported by the power supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatteryState {
    Charging,
    Discharging,
    Full,
}

/// The value of one metric, tagged by kind so the publisher and tests can
/// match exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricValue {
    /// Not yet sampled, or no prior counters to compute a delta from.
    Pending,
    Percent {
        percent: f64,
    },
    Throughput {
        rx_bytes_per_sec: u64,
        tx_bytes_per_sec: u64,
    },
    DiskUsage {
        mounts: Vec<MountUsage>,
    },
    Temperature {
        celsius: f64,
    },
    Battery {
        percent: u8,
        state: BatteryState,
    },
    Volume {
        percent: u8,
        muted: bool,
    },
    Text {
        text: String,
    },
}

impl MetricValue {
    /// Whether two values are of the same kind. A kind change is always a
    /// significant change, whatever the per-metric threshold says.
    pub fn same_kind(&self, other: &MetricValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Health of one metric as seen by the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatus {
    /// Recent sample succeeded.
    Ok,
    /// Repeated recent failures; the last good value is still shown.
    Degraded,
    /// Capability absent on this machine.
    Unavailable,
}

/// Result of one collector invocation. Ephemeral: created per tick and
/// consumed immediately by the aggregator.
#[derive(Debug)]
pub struct Reading {
    pub metric: MetricId,
    /// Unix timestamp in milliseconds at sample time.
    pub ts_ms: u64,
    pub result: std::result::Result<MetricValue, CollectError>,
}

/// One delta message: a self-contained line for a single metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub metric: MetricId,
    pub value: MetricValue,
    pub status: MetricStatus,
    /// Unix timestamp in milliseconds.
    pub ts: u64,
}

/// Current value and status of one metric inside a full snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    pub value: MetricValue,
    pub status: MetricStatus,
}

/// A full snapshot: every known metric at one instant. Immutable once
/// constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Unix timestamp in milliseconds.
    pub ts: u64,
    pub snapshot: BTreeMap<MetricId, MetricEntry>,
}

/// One publish cycle's output.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Only the metrics that changed significantly since the last publish.
    Delta(Vec<MetricRecord>),
    /// Heartbeat or first publish: the complete state.
    Snapshot(SnapshotRecord),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_id_serializes_to_snake_case() {
        assert_eq!(serde_json::to_string(&MetricId::Cpu).unwrap(), "\"cpu\"");
        assert_eq!(
            serde_json::to_string(&MetricId::Workspace).unwrap(),
            "\"workspace\""
        );
        for id in MetricId::ALL {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.as_str()));
        }
    }

    #[test]
    fn metric_value_is_kind_tagged() {
        let value = MetricValue::Percent { percent: 42.5 };
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["kind"], "percent");
        assert_eq!(json["percent"], 42.5);

        let pending = serde_json::to_value(MetricValue::Pending).unwrap();
        assert_eq!(pending["kind"], "pending");
    }

    #[test]
    fn same_kind_ignores_payload() {
        let a = MetricValue::Percent { percent: 1.0 };
        let b = MetricValue::Percent { percent: 99.0 };
        let c = MetricValue::Temperature { celsius: 1.0 };
        assert!(a.same_kind(&b));
        assert!(!a.same_kind(&c));
        assert!(!a.same_kind(&MetricValue::Pending));
    }

    #[test]
    fn metric_record_matches_wire_schema() {
        let record = MetricRecord {
            metric: MetricId::Battery,
            value: MetricValue::Battery {
                percent: 80,
                state: BatteryState::Discharging,
            },
            status: MetricStatus::Ok,
            ts: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["metric"], "battery");
        assert_eq!(json["status"], "ok");
        assert_eq!(json["value"]["kind"], "battery");
        assert_eq!(json["value"]["state"], "discharging");
        assert_eq!(json["ts"], 1_700_000_000_000u64);
    }

    #[test]
    fn snapshot_keys_are_ordered_metric_names() {
        let mut snapshot = BTreeMap::new();
        for id in MetricId::ALL {
            snapshot.insert(
                id,
                MetricEntry {
                    value: MetricValue::Pending,
                    status: MetricStatus::Ok,
                },
            );
        }
        let record = SnapshotRecord { ts: 1, snapshot };
        let json = serde_json::to_value(&record).unwrap();
        let map = json["snapshot"].as_object().unwrap();
        assert_eq!(map.len(), MetricId::ALL.len());
        assert!(map.contains_key("cpu"));
        assert!(map.contains_key("clock"));
        assert_eq!(map["cpu"]["value"]["kind"], "pending");
    }
}
