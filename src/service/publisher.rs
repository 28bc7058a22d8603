//! Line-oriented JSON publishing.
//!
//! Each delta record becomes its own newline-terminated, independently
//! parseable object; a full snapshot is one line. The writer is flushed
//! after every frame so the consumer never lags behind by more than a
//! scheduler tick.

use crate::error::Result;
use crate::metrics::data::Frame;
use futures_util::StreamExt;
use std::io::Write;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

pub struct Publisher<W: Write> {
    out: W,
}

impl<W: Write> Publisher<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consume frames until the scheduler drops its sender. A broken pipe
    /// means the consumer went away; that ends publishing cleanly.
    pub async fn run(mut self, frames: mpsc::Receiver<Frame>) -> Result<()> {
        let mut frames = ReceiverStream::new(frames);
        while let Some(frame) = frames.next().await {
            match self.write_frame(&frame) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => {
                    info!("output pipe closed, stopping publisher");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            }
        }
        debug!("frame stream ended");
        Ok(())
    }

    pub fn write_frame(&mut self, frame: &Frame) -> std::io::Result<()> {
        match frame {
            Frame::Delta(records) => {
                for record in records {
                    serde_json::to_writer(&mut self.out, record)?;
                    self.out.write_all(b"\n")?;
                }
            }
            Frame::Snapshot(record) => {
                serde_json::to_writer(&mut self.out, record)?;
                self.out.write_all(b"\n")?;
            }
        }
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::data::{
        MetricEntry, MetricId, MetricRecord, MetricStatus, MetricValue, SnapshotRecord,
    };
    use std::collections::BTreeMap;

    fn delta_frame() -> Frame {
        Frame::Delta(vec![
            MetricRecord {
                metric: MetricId::Cpu,
                value: MetricValue::Percent { percent: 12.5 },
                status: MetricStatus::Ok,
                ts: 1_000,
            },
            MetricRecord {
                metric: MetricId::Volume,
                value: MetricValue::Volume {
                    percent: 40,
                    muted: false,
                },
                status: MetricStatus::Ok,
                ts: 1_000,
            },
        ])
    }

    #[test]
    fn delta_frame_writes_one_line_per_record() {
        let mut publisher = Publisher::new(Vec::new());
        publisher.write_frame(&delta_frame()).unwrap();
        let output = String::from_utf8(publisher.out).unwrap();
        let lines: Vec<&str> = output.trim_end().split('\n').collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let json: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(json["metric"].is_string());
            assert!(json["value"]["kind"].is_string());
            assert_eq!(json["status"], "ok");
        }
    }

    #[test]
    fn snapshot_frame_is_a_single_line() {
        let mut snapshot = BTreeMap::new();
        snapshot.insert(
            MetricId::Clock,
            MetricEntry {
                value: MetricValue::Text {
                    text: "12:30".to_string(),
                },
                status: MetricStatus::Ok,
            },
        );
        let frame = Frame::Snapshot(SnapshotRecord { ts: 42, snapshot });

        let mut publisher = Publisher::new(Vec::new());
        publisher.write_frame(&frame).unwrap();
        let output = String::from_utf8(publisher.out).unwrap();
        assert_eq!(output.matches('\n').count(), 1);
        assert!(output.ends_with('\n'));
        let json: serde_json::Value = serde_json::from_str(output.trim_end()).unwrap();
        assert_eq!(json["ts"], 42);
        assert_eq!(json["snapshot"]["clock"]["value"]["text"], "12:30");
    }

    #[tokio::test]
    async fn run_drains_the_channel_and_finishes() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(delta_frame()).await.unwrap();
        drop(tx);
        let publisher = Publisher::new(Vec::new());
        publisher.run(rx).await.unwrap();
    }
}
