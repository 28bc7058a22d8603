//! Active workspace identifier from the window manager's IPC query.
//!
//! The window manager is an external collaborator; all we need is a
//! synchronous "current workspace" query. JSON output (hyprctl, swaymsg)
//! yields the `id` or `name` field; anything else is taken as plain text.

use crate::config::WorkspaceConfig;
use crate::error::CollectError;
use crate::metrics::data::{MetricId, MetricValue};
use crate::metrics::traits::Collector;
use crate::metrics::volume::run_query;
use std::time::Duration;

pub struct WorkspaceCollector {
    interval: Duration,
    command: Vec<String>,
}

impl WorkspaceCollector {
    pub fn new(config: &WorkspaceConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
            command: config.command.clone(),
        }
    }
}

impl Collector for WorkspaceCollector {
    fn id(&self) -> MetricId {
        MetricId::Workspace
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn blocking(&self) -> bool {
        true
    }

    fn sample(&mut self) -> Result<MetricValue, CollectError> {
        let output = run_query(&self.command)?;
        let text = parse_workspace_output(&output)?;
        Ok(MetricValue::Text { text })
    }
}

pub(crate) fn parse_workspace_output(output: &str) -> Result<String, CollectError> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Err(CollectError::parse_error("empty workspace query output"));
    }
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(id) = json.get("id") {
            return Ok(json_scalar_to_string(id));
        }
        if let Some(name) = json.get("name") {
            return Ok(json_scalar_to_string(name));
        }
    }
    Ok(trimmed
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_string())
}

fn json_scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
