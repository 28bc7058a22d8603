//! The polling service: scheduler, aggregator, publisher.

pub mod aggregator;
pub mod publisher;
pub mod scheduler;

pub use aggregator::Aggregator;
pub use publisher::Publisher;
pub use scheduler::Scheduler;

use crate::config::Config;
use crate::error::{CollectError, Result, ServiceError};
use crate::metrics::data::{Frame, Reading, SnapshotRecord};
use crate::util::unix_ms;
use std::time::Duration;
use tokio::task;
use tokio::time;

/// Sample every collector exactly once and return the resulting full
/// snapshot. Rate-based metrics (cpu, network) have no prior counters on
/// a one-shot run and report pending.
pub async fn collect_once(config: &Config) -> Result<SnapshotRecord> {
    let mut aggregator = Aggregator::new(
        config.degraded_threshold,
        config.heartbeat_secs * 1_000,
    );
    let timeout = Duration::from_millis(config.collector_timeout_ms);

    for mut collector in crate::metrics::default_collectors(config) {
        let id = collector.id();
        aggregator.register(id, collector.change_predicate());
        let result = if collector.blocking() {
            let handle = task::spawn_blocking(move || collector.sample());
            match time::timeout(timeout, handle).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_err)) => Err(CollectError::transient(format!(
                    "collector task failed: {join_err}"
                ))),
                Err(_) => Err(CollectError::Timeout(timeout)),
            }
        } else {
            collector.sample()
        };
        aggregator.merge(Reading {
            metric: id,
            ts_ms: unix_ms(),
            result,
        });
    }

    match aggregator.flush(unix_ms()) {
        Some(Frame::Snapshot(record)) => Ok(record),
        _ => Err(ServiceError::channel_error(
            "aggregator produced no snapshot",
        )),
    }
}
