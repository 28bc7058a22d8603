//! # barpoll - frugal status-bar metrics service
//!
//! A long-running poller that samples system state (CPU, memory, disk,
//! network, temperature, battery, volume, active workspace, clock) on
//! per-metric cadences and publishes line-oriented JSON to stdout for a
//! status-bar widget system to render.
//!
//! Design in one paragraph: a single cooperative scheduler owns every
//! collector and ticks them on their individual intervals, so the process
//! uses O(1) threads regardless of metric count. Readings are merged into
//! an aggregator-owned state map; only values that moved past their
//! per-metric significance threshold are published, plus a periodic full
//! snapshot so a restarted consumer can resync. Collector failures are
//! per-metric: transient ones retry with backoff and eventually mark the
//! metric degraded, missing hardware is reported unavailable and retried
//! slowly, and a decreasing monotonic counter skips the interval instead
//! of publishing a nonsense rate.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use barpoll::{Config, Publisher, Scheduler};
//! use tokio::sync::{mpsc, watch};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let collectors = barpoll::metrics::default_collectors(&config);
//!     let (frame_tx, frame_rx) = mpsc::channel(16);
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!
//!     let scheduler = Scheduler::new(&config, collectors, frame_tx)?;
//!     tokio::spawn(scheduler.run(shutdown_rx));
//!     Publisher::new(std::io::stdout().lock()).run(frame_rx).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod service;
pub mod util;

// Re-export public API
pub use config::Config;
pub use error::{CollectError, Result, ServiceError};
pub use metrics::{
    data::{Frame, MetricId, MetricRecord, MetricStatus, MetricValue, SnapshotRecord},
    traits::Collector,
};
pub use service::{collect_once, Aggregator, Publisher, Scheduler};

/// Default base scheduler tick in milliseconds.
pub const DEFAULT_TICK_MS: u64 = 1_000;

/// Default full-snapshot heartbeat period in seconds.
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;
