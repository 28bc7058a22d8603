//! The cooperative scheduling loop.
//!
//! One tokio task owns every collector and the aggregator. A single base
//! ticker drives all cadences: each tick fires the collectors whose due
//! time has elapsed. Inline collectors run on the loop; blocking ones are
//! moved onto a `spawn_blocking` worker with a deadline and their slot is
//! restored when the call returns. Scheduling threads stay O(1) in the
//! number of metrics.

use crate::config::Config;
use crate::error::{CollectError, Result, ServiceError};
use crate::metrics::data::{Frame, MetricId, MetricValue, Reading};
use crate::metrics::Collector;
use crate::service::aggregator::Aggregator;
use crate::util::unix_ms;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Cadence for retrying permanently-unavailable collectors, and the cap
/// for transient-failure backoff.
pub const SLOW_RETRY: Duration = Duration::from_secs(60);

/// Sampling interval after repeated transient failures: doubles per
/// failure past the degraded threshold, capped at the slow retry cadence.
pub(crate) fn backoff_interval(base: Duration, failures: u32, threshold: u32) -> Duration {
    if failures < threshold {
        return base;
    }
    let exponent = (failures - threshold + 1).min(4);
    base.saturating_mul(1u32 << exponent).min(SLOW_RETRY)
}

struct Slot {
    id: MetricId,
    interval: Duration,
    blocking: bool,
    /// Empty while a blocking sample is in flight.
    collector: Option<Box<dyn Collector>>,
    next_due: Instant,
    /// Deadline of the in-flight blocking sample, if any.
    deadline: Option<Instant>,
    /// The in-flight sample already missed its deadline; discard its
    /// eventual result.
    timed_out: bool,
}

type WorkerResult = (
    usize,
    Box<dyn Collector>,
    std::result::Result<MetricValue, CollectError>,
);

pub struct Scheduler {
    slots: Vec<Slot>,
    aggregator: Aggregator,
    frames: mpsc::Sender<Frame>,
    tick: Duration,
    timeout: Duration,
    degraded_threshold: u32,
}

impl Scheduler {
    pub fn new(
        config: &Config,
        collectors: Vec<Box<dyn Collector>>,
        frames: mpsc::Sender<Frame>,
    ) -> Result<Self> {
        if collectors.is_empty() {
            return Err(ServiceError::config_error("no collectors configured"));
        }
        let mut aggregator = Aggregator::new(
            config.degraded_threshold,
            config.heartbeat_secs * 1_000,
        );
        let now = Instant::now();
        let mut slots = Vec::with_capacity(collectors.len());
        for collector in collectors {
            let id = collector.id();
            if aggregator.is_registered(id) {
                return Err(ServiceError::config_error(format!(
                    "duplicate collector for metric {id}"
                )));
            }
            aggregator.register(id, collector.change_predicate());
            slots.push(Slot {
                id,
                interval: collector.interval(),
                blocking: collector.blocking(),
                collector: Some(collector),
                next_due: now,
                deadline: None,
                timed_out: false,
            });
        }
        Ok(Self {
            slots,
            aggregator,
            frames,
            tick: Duration::from_millis(config.tick_ms),
            timeout: Duration::from_millis(config.collector_timeout_ms),
            degraded_threshold: config.degraded_threshold,
        })
    }

    /// Run until shutdown is signalled or the consumer goes away.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut inflight: JoinSet<WorkerResult> = JoinSet::new();

        info!(
            collectors = self.slots.len(),
            tick_ms = self.tick.as_millis() as u64,
            "scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Instant::now();
                    self.expire_overdue(now);
                    for idx in 0..self.slots.len() {
                        if self.slots[idx].next_due <= now
                            && self.slots[idx].collector.is_some()
                        {
                            self.dispatch(idx, now, &mut inflight);
                        }
                    }
                    if let Some(frame) = self.aggregator.flush(unix_ms()) {
                        if self.frames.send(frame).await.is_err() {
                            info!("publisher gone, stopping scheduler");
                            break;
                        }
                    }
                }
                Some(joined) = inflight.join_next() => {
                    match joined {
                        Ok((idx, collector, result)) => {
                            self.finish_blocking(idx, collector, result);
                        }
                        Err(err) => {
                            // The collector box is gone with the panicked
                            // task; the metric stays unavailable.
                            error!(error = %err, "blocking collector task failed");
                        }
                    }
                }
                _ = shutdown.changed() => {
                    info!("shutdown signalled, stopping scheduler");
                    break;
                }
            }
        }

        // Let in-flight blocking calls finish within their deadline;
        // their results are discarded and nothing is published after
        // this point.
        if !inflight.is_empty() {
            let drained = time::timeout(self.timeout, async {
                while inflight.join_next().await.is_some() {}
            })
            .await;
            if drained.is_err() {
                warn!("in-flight collector calls abandoned at shutdown");
            }
        }
        info!("scheduler stopped");
    }

    /// Invoke one due collector: inline, or on a worker with a deadline.
    fn dispatch(&mut self, idx: usize, now: Instant, inflight: &mut JoinSet<WorkerResult>) {
        let slot = &mut self.slots[idx];
        if slot.blocking {
            let mut collector = slot.collector.take().expect("checked by caller");
            slot.deadline = Some(now + self.timeout);
            slot.timed_out = false;
            inflight.spawn_blocking(move || {
                let result = collector.sample();
                (idx, collector, result)
            });
        } else {
            let collector = slot.collector.as_mut().expect("checked by caller");
            let result = collector.sample();
            self.settle(idx, now, result);
        }
    }

    /// Turn blocking samples past their deadline into timeout failures
    /// for this tick. The worker keeps running; its late result is
    /// discarded when it eventually lands.
    fn expire_overdue(&mut self, now: Instant) {
        for idx in 0..self.slots.len() {
            let slot = &mut self.slots[idx];
            let overdue = matches!(slot.deadline, Some(deadline) if now >= deadline)
                && !slot.timed_out;
            if overdue {
                slot.timed_out = true;
                warn!(metric = %slot.id, timeout = ?self.timeout, "collector timed out");
                self.settle(idx, now, Err(CollectError::Timeout(self.timeout)));
            }
        }
    }

    /// A blocking sample returned: restore the collector and, unless the
    /// tick already timed out, merge its result.
    fn finish_blocking(
        &mut self,
        idx: usize,
        collector: Box<dyn Collector>,
        result: std::result::Result<MetricValue, CollectError>,
    ) {
        let now = Instant::now();
        let slot = &mut self.slots[idx];
        slot.collector = Some(collector);
        slot.deadline = None;
        if slot.timed_out {
            slot.timed_out = false;
            debug!(metric = %slot.id, "late result after timeout discarded");
            return;
        }
        self.settle(idx, now, result);
    }

    /// Merge a reading and reschedule the slot.
    fn settle(
        &mut self,
        idx: usize,
        now: Instant,
        result: std::result::Result<MetricValue, CollectError>,
    ) {
        let id = self.slots[idx].id;
        let base = self.slots[idx].interval;
        let permanent = matches!(result, Err(ref err) if err.is_permanent());
        let failed = result.is_err() && !matches!(result, Err(CollectError::CounterReset));

        self.aggregator.merge(Reading {
            metric: id,
            ts_ms: unix_ms(),
            result,
        });

        let next_interval = if permanent {
            SLOW_RETRY
        } else if failed {
            backoff_interval(base, self.aggregator.failure_streak(id), self.degraded_threshold)
        } else {
            base
        };
        self.slots[idx].next_due = now + next_interval;
    }
}
