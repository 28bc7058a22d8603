//! End-to-end scheduler/aggregator/publisher tests with scripted
//! collectors standing in for real sensors.

use barpoll::error::CollectError;
use barpoll::metrics::data::{Frame, MetricId, MetricStatus, MetricValue};
use barpoll::metrics::Collector;
use barpoll::{Config, Publisher, Scheduler};
use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

#[derive(Clone)]
enum Step {
    Value(f64),
    Fail,
}

/// Replays a fixed script, then repeats the final step forever.
struct ScriptedCollector {
    id: MetricId,
    interval: Duration,
    steps: VecDeque<Step>,
    last: Step,
}

impl ScriptedCollector {
    fn new(id: MetricId, interval: Duration, steps: Vec<Step>) -> Self {
        let last = steps.last().cloned().unwrap_or(Step::Fail);
        Self {
            id,
            interval,
            steps: steps.into(),
            last,
        }
    }
}

impl Collector for ScriptedCollector {
    fn id(&self) -> MetricId {
        self.id
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn sample(&mut self) -> Result<MetricValue, CollectError> {
        let step = self.steps.pop_front().unwrap_or_else(|| self.last.clone());
        match step {
            Step::Value(percent) => Ok(MetricValue::Percent { percent }),
            Step::Fail => Err(CollectError::transient("scripted failure")),
        }
    }
}

/// A blocking collector that always overruns its deadline.
struct StuckCollector {
    interval: Duration,
    stall: Duration,
}

impl Collector for StuckCollector {
    fn id(&self) -> MetricId {
        MetricId::Temperature
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn blocking(&self) -> bool {
        true
    }

    fn sample(&mut self) -> Result<MetricValue, CollectError> {
        std::thread::sleep(self.stall);
        Ok(MetricValue::Temperature { celsius: 40.0 })
    }
}

fn fast_config() -> Config {
    let mut config = Config::default();
    config.tick_ms = 10;
    config.heartbeat_secs = 60;
    config.collector_timeout_ms = 50;
    config
}

async fn next_frame(rx: &mut mpsc::Receiver<Frame>) -> Frame {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("frame channel closed early")
}

fn start(
    config: &Config,
    collectors: Vec<Box<dyn Collector>>,
) -> (mpsc::Receiver<Frame>, watch::Sender<bool>) {
    let (frame_tx, frame_rx) = mpsc::channel(64);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = Scheduler::new(config, collectors, frame_tx).expect("scheduler init");
    tokio::spawn(scheduler.run(shutdown_rx));
    (frame_rx, shutdown_tx)
}

#[tokio::test]
async fn first_publish_is_a_full_snapshot_then_deltas() {
    let config = fast_config();
    let collector = ScriptedCollector::new(
        MetricId::Cpu,
        Duration::from_millis(10),
        vec![Step::Value(10.0), Step::Value(20.0), Step::Value(30.0)],
    );
    let (mut rx, _shutdown) = start(&config, vec![Box::new(collector)]);

    match next_frame(&mut rx).await {
        Frame::Snapshot(record) => {
            assert_eq!(
                record.snapshot[&MetricId::Cpu].value,
                MetricValue::Percent { percent: 10.0 }
            );
        }
        other => panic!("expected snapshot first, got {other:?}"),
    }

    match next_frame(&mut rx).await {
        Frame::Delta(records) => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].metric, MetricId::Cpu);
            assert_eq!(records[0].status, MetricStatus::Ok);
        }
        other => panic!("expected delta second, got {other:?}"),
    }
}

#[tokio::test]
async fn unchanged_values_publish_only_heartbeats() {
    let mut config = fast_config();
    config.heartbeat_secs = 1;
    let collector = ScriptedCollector::new(
        MetricId::Cpu,
        Duration::from_millis(10),
        vec![Step::Value(50.0)],
    );
    let (mut rx, _shutdown) = start(&config, vec![Box::new(collector)]);

    let mut snapshots = 0;
    let mut deltas = 0;
    let deadline = tokio::time::Instant::now() + Duration::from_millis(2_500);
    while tokio::time::Instant::now() < deadline {
        match timeout(Duration::from_millis(200), rx.recv()).await {
            Ok(Some(Frame::Snapshot(_))) => snapshots += 1,
            Ok(Some(Frame::Delta(_))) => deltas += 1,
            Ok(None) => break,
            Err(_) => continue,
        }
    }
    // Initial snapshot plus roughly one heartbeat per second; the exact
    // count depends on timing slack.
    assert!(snapshots >= 2, "expected heartbeats, saw {snapshots}");
    assert_eq!(deltas, 0, "no value changed, no delta expected");
}

#[tokio::test]
async fn repeated_failures_degrade_and_success_recovers() {
    let config = fast_config();
    let collector = ScriptedCollector::new(
        MetricId::Cpu,
        Duration::from_millis(10),
        vec![
            Step::Value(50.0),
            Step::Fail,
            Step::Fail,
            Step::Fail,
            Step::Value(50.0),
        ],
    );
    let (mut rx, _shutdown) = start(&config, vec![Box::new(collector)]);

    let mut saw_degraded = false;
    let mut recovered = false;
    for _ in 0..20 {
        match next_frame(&mut rx).await {
            Frame::Delta(records) => {
                for record in records {
                    if record.status == MetricStatus::Degraded {
                        saw_degraded = true;
                        // Last good value is still shown while degraded.
                        assert_eq!(record.value, MetricValue::Percent { percent: 50.0 });
                    }
                    if saw_degraded && record.status == MetricStatus::Ok {
                        recovered = true;
                    }
                }
            }
            Frame::Snapshot(_) => {}
        }
        if recovered {
            break;
        }
    }
    assert!(saw_degraded, "three failures should degrade the metric");
    assert!(recovered, "a success should restore ok status");
}

#[tokio::test]
async fn stuck_blocking_collector_times_out_without_stalling_others() {
    let mut config = fast_config();
    config.degraded_threshold = 1;
    let stuck = StuckCollector {
        interval: Duration::from_millis(10),
        stall: Duration::from_millis(2_000),
    };
    let lively = ScriptedCollector::new(
        MetricId::Cpu,
        Duration::from_millis(10),
        vec![Step::Value(10.0), Step::Value(20.0), Step::Value(30.0)],
    );
    let (mut rx, _shutdown) = start(&config, vec![Box::new(stuck), Box::new(lively)]);

    let mut cpu_updates = 0;
    let mut temperature_degraded = false;
    for _ in 0..20 {
        match next_frame(&mut rx).await {
            Frame::Delta(records) => {
                for record in records {
                    match record.metric {
                        MetricId::Cpu => cpu_updates += 1,
                        MetricId::Temperature => {
                            if record.status == MetricStatus::Degraded {
                                temperature_degraded = true;
                            }
                        }
                        _ => {}
                    }
                }
            }
            Frame::Snapshot(_) => {}
        }
        if temperature_degraded && cpu_updates >= 2 {
            break;
        }
    }
    assert!(temperature_degraded, "timeout should degrade the metric");
    assert!(
        cpu_updates >= 2,
        "a stuck collector must not delay other metrics"
    );
}

#[tokio::test]
async fn shutdown_stops_publishing_and_closes_the_stream() {
    let config = fast_config();
    let collector = ScriptedCollector::new(
        MetricId::Cpu,
        Duration::from_millis(10),
        vec![Step::Value(1.0), Step::Value(2.0), Step::Value(3.0)],
    );
    let (mut rx, shutdown) = start(&config, vec![Box::new(collector)]);

    // Let it publish at least once, then signal shutdown.
    let _ = next_frame(&mut rx).await;
    shutdown.send(true).unwrap();

    // The channel must close promptly; pending frames may drain but no
    // new ones appear afterwards.
    let closed = timeout(Duration::from_secs(2), async {
        while rx.recv().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok(), "frame stream did not close after shutdown");
    assert!(rx.recv().await.is_none());
}

/// A Write handle tests can inspect after the publisher consumed it.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn published_lines_are_independent_json_objects() {
    let config = fast_config();
    let collector = ScriptedCollector::new(
        MetricId::Cpu,
        Duration::from_millis(10),
        vec![Step::Value(10.0), Step::Value(20.0), Step::Value(30.0)],
    );
    let (frame_tx, frame_rx) = mpsc::channel(64);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler =
        Scheduler::new(&config, vec![Box::new(collector) as Box<dyn Collector>], frame_tx)
            .expect("scheduler init");
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx));

    let buffer = SharedBuffer::default();
    let publisher_task = tokio::spawn(Publisher::new(buffer.clone()).run(frame_rx));

    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown_tx.send(true).unwrap();
    scheduler_task.await.unwrap();
    publisher_task.await.unwrap().unwrap();

    let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    let lines: Vec<&str> = output.trim_end().split('\n').collect();
    assert!(lines.len() >= 2, "expected snapshot plus deltas: {output}");

    let mut last_ts = 0u64;
    for line in lines {
        let json: serde_json::Value = serde_json::from_str(line).expect("each line parses alone");
        let ts = json["ts"].as_u64().expect("every message is timestamped");
        assert!(ts > last_ts, "publish timestamps must increase");
        last_ts = ts;
        assert!(json.get("snapshot").is_some() || json.get("metric").is_some());
    }
}
