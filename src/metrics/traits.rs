//! The collector capability set.

use crate::error::CollectError;
use crate::metrics::data::{MetricId, MetricValue};
use std::time::Duration;

/// Decides whether a new value differs meaningfully from the last
/// published one. Captured at registration so the aggregator can apply it
/// without holding the collector itself.
pub type ChangeFn = Box<dyn Fn(&MetricValue, &MetricValue) -> bool + Send + Sync>;

/// One sampling unit. Implementations keep whatever state they need
/// between invocations (previous counters, resolved sensor paths).
///
/// `sample` is synchronous; the scheduler runs collectors that touch slow
/// I/O (`blocking() == true`) on a bounded worker with a deadline, and
/// everything else inline on the scheduling task.
pub trait Collector: Send {
    /// The metric this collector produces.
    fn id(&self) -> MetricId;

    /// Sampling cadence. Must be positive.
    fn interval(&self) -> Duration;

    /// Whether `sample` may block on slow I/O or an external process.
    fn blocking(&self) -> bool {
        false
    }

    /// Take one reading.
    fn sample(&mut self) -> Result<MetricValue, CollectError>;

    /// Significance predicate for this metric. The default treats any
    /// inequality as significant (workspace, clock, volume, battery).
    fn change_predicate(&self) -> ChangeFn {
        Box::new(|old, new| old != new)
    }
}

/// Significance predicate for scalar metrics: a kind change or a move of
/// at least `threshold` in the extracted scalar.
pub(crate) fn scalar_change(
    threshold: f64,
    extract: fn(&MetricValue) -> Option<f64>,
) -> ChangeFn {
    Box::new(move |old, new| {
        if !old.same_kind(new) {
            return true;
        }
        match (extract(old), extract(new)) {
            (Some(a), Some(b)) => (a - b).abs() >= threshold,
            _ => old != new,
        }
    })
}
