//! Snapshot aggregation, change gating, and per-metric health tracking.
//!
//! The aggregator owns the only mutable copy of metric state. It is driven
//! exclusively from the scheduler task: readings are merged one at a time,
//! then `flush` decides whether this cycle publishes a delta, a heartbeat
//! snapshot, or nothing.

use crate::error::CollectError;
use crate::metrics::data::{
    Frame, MetricEntry, MetricId, MetricRecord, MetricStatus, Reading, SnapshotRecord,
};
use crate::metrics::traits::ChangeFn;
use crate::metrics::MetricValue;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Last-known state of one metric. Lives for the process lifetime.
struct MetricState {
    /// Last good value; `None` until the first successful sample.
    value: Option<MetricValue>,
    status: MetricStatus,
    /// Consecutive transient failures since the last success.
    failures: u32,
    /// What the consumer last saw, for the significance predicate.
    published: Option<(MetricValue, MetricStatus)>,
    dirty: bool,
    change: ChangeFn,
}

impl MetricState {
    fn new(change: ChangeFn) -> Self {
        Self {
            value: None,
            status: MetricStatus::Ok,
            failures: 0,
            published: None,
            dirty: false,
            change,
        }
    }

    fn current_value(&self) -> MetricValue {
        self.value.clone().unwrap_or(MetricValue::Pending)
    }
}

pub struct Aggregator {
    states: BTreeMap<MetricId, MetricState>,
    degraded_threshold: u32,
    heartbeat_ms: u64,
    last_full_ms: Option<u64>,
    last_publish_ms: u64,
}

impl Aggregator {
    pub fn new(degraded_threshold: u32, heartbeat_ms: u64) -> Self {
        Self {
            states: BTreeMap::new(),
            degraded_threshold,
            heartbeat_ms,
            last_full_ms: None,
            last_publish_ms: 0,
        }
    }

    /// Register a metric and its significance predicate. Must be called
    /// once per metric before the first merge.
    pub fn register(&mut self, metric: MetricId, change: ChangeFn) {
        self.states.insert(metric, MetricState::new(change));
    }

    pub fn is_registered(&self, metric: MetricId) -> bool {
        self.states.contains_key(&metric)
    }

    /// Consecutive transient failures recorded for a metric.
    pub fn failure_streak(&self, metric: MetricId) -> u32 {
        self.states.get(&metric).map_or(0, |s| s.failures)
    }

    /// Merge one reading into the state map.
    pub fn merge(&mut self, reading: Reading) {
        let threshold = self.degraded_threshold;
        let Some(state) = self.states.get_mut(&reading.metric) else {
            warn!(metric = %reading.metric, "reading for unregistered metric dropped");
            return;
        };

        match reading.result {
            Ok(value) => {
                state.failures = 0;
                state.status = MetricStatus::Ok;
                let significant = match &state.published {
                    None => true,
                    Some((published_value, published_status)) => {
                        (state.change)(published_value, &value)
                            || *published_status != MetricStatus::Ok
                    }
                };
                state.value = Some(value);
                state.dirty |= significant;
            }
            Err(CollectError::CounterReset) => {
                // A skipped interval: keep value, status, and streak as-is.
                debug!(metric = %reading.metric, "counter reset, interval skipped");
            }
            Err(CollectError::Unavailable(reason)) => {
                if state.status != MetricStatus::Unavailable {
                    warn!(metric = %reading.metric, %reason, "metric unavailable");
                    state.status = MetricStatus::Unavailable;
                    state.dirty = true;
                }
            }
            Err(err) => {
                state.failures += 1;
                debug!(
                    metric = %reading.metric,
                    failures = state.failures,
                    error = %err,
                    "collector failure"
                );
                if state.failures >= threshold && state.status == MetricStatus::Ok {
                    warn!(
                        metric = %reading.metric,
                        failures = state.failures,
                        "metric degraded"
                    );
                    state.status = MetricStatus::Degraded;
                    state.dirty = true;
                }
            }
        }
    }

    /// Decide what this publish cycle emits. Timestamps are strictly
    /// monotonic across publishes even if the wall clock stalls.
    pub fn flush(&mut self, now_ms: u64) -> Option<Frame> {
        let heartbeat_due = match self.last_full_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.heartbeat_ms,
        };

        if heartbeat_due {
            let ts = self.next_publish_ts(now_ms);
            self.last_full_ms = Some(ts);
            let mut snapshot = BTreeMap::new();
            for (metric, state) in &mut self.states {
                let value = state.current_value();
                state.published = Some((value.clone(), state.status));
                state.dirty = false;
                snapshot.insert(
                    *metric,
                    MetricEntry {
                        value,
                        status: state.status,
                    },
                );
            }
            return Some(Frame::Snapshot(SnapshotRecord { ts, snapshot }));
        }

        if !self.states.values().any(|s| s.dirty) {
            return None;
        }

        let ts = self.next_publish_ts(now_ms);
        let mut records = Vec::new();
        for (metric, state) in &mut self.states {
            if !state.dirty {
                continue;
            }
            let value = state.current_value();
            state.published = Some((value.clone(), state.status));
            state.dirty = false;
            records.push(MetricRecord {
                metric: *metric,
                value,
                status: state.status,
                ts,
            });
        }
        Some(Frame::Delta(records))
    }

    fn next_publish_ts(&mut self, now_ms: u64) -> u64 {
        let ts = now_ms.max(self.last_publish_ms + 1);
        self.last_publish_ms = ts;
        ts
    }
}
