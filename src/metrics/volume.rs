//! Mixer level and mute flag via an external mixer query command.
//!
//! Understands wpctl output ("Volume: 0.45 [MUTED]") and the bracket form
//! amixer prints ("[45%] ... [off]").

use crate::config::VolumeConfig;
use crate::error::CollectError;
use crate::metrics::data::{MetricId, MetricValue};
use crate::metrics::traits::Collector;
use std::process::Command;
use std::time::Duration;

pub struct VolumeCollector {
    interval: Duration,
    command: Vec<String>,
}

impl VolumeCollector {
    pub fn new(config: &VolumeConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
            command: config.command.clone(),
        }
    }
}

impl Collector for VolumeCollector {
    fn id(&self) -> MetricId {
        MetricId::Volume
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn blocking(&self) -> bool {
        true
    }

    fn sample(&mut self) -> Result<MetricValue, CollectError> {
        let output = run_query(&self.command)?;
        parse_volume_output(&output)
    }
}

pub(crate) fn run_query(command: &[String]) -> Result<String, CollectError> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| CollectError::unavailable("empty query command"))?;
    let output = Command::new(program).args(args).output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CollectError::unavailable(format!("{program} not installed"))
        } else {
            CollectError::transient(format!("{program}: {e}"))
        }
    })?;
    if !output.status.success() {
        return Err(CollectError::transient(format!(
            "{program} exited with {}",
            output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub(crate) fn parse_volume_output(output: &str) -> Result<MetricValue, CollectError> {
    if let Some(value) = parse_wpctl(output) {
        return Ok(value);
    }
    if let Some(value) = parse_amixer(output) {
        return Ok(value);
    }
    Err(CollectError::parse_error(format!(
        "unrecognized mixer output: {:?}",
        output.lines().next().unwrap_or_default()
    )))
}

/// "Volume: 0.45" or "Volume: 0.45 [MUTED]"
fn parse_wpctl(output: &str) -> Option<MetricValue> {
    let rest = output.trim().strip_prefix("Volume:")?.trim();
    let level_token = rest.split_whitespace().next()?;
    let level: f64 = level_token.parse().ok()?;
    Some(MetricValue::Volume {
        percent: (level * 100.0).round().clamp(0.0, 100.0) as u8,
        muted: rest.contains("[MUTED]"),
    })
}

/// "... Playback 32768 [45%] [-16.00dB] [on]"
fn parse_amixer(output: &str) -> Option<MetricValue> {
    let mut percent = None;
    let mut muted = None;
    for token in output.split('[') {
        let Some(token) = token.split(']').next() else {
            continue;
        };
        if let Some(number) = token.strip_suffix('%') {
            if let Ok(value) = number.parse::<u32>() {
                percent.get_or_insert(value.min(100) as u8);
            }
        } else if token == "on" || token == "off" {
            muted.get_or_insert(token == "off");
        }
    }
    Some(MetricValue::Volume {
        percent: percent?,
        muted: muted.unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wpctl_unmuted() {
        assert_eq!(
            parse_volume_output("Volume: 0.45\n").unwrap(),
            MetricValue::Volume {
                percent: 45,
                muted: false
            }
        );
    }

    #[test]
    fn parses_wpctl_muted() {
        assert_eq!(
            parse_volume_output("Volume: 1.00 [MUTED]\n").unwrap(),
            MetricValue::Volume {
                percent: 100,
                muted: true
            }
        );
    }

    #[test]
    fn parses_amixer_bracket_form() {
        let output = "Simple mixer control 'Master',0\n\
                      Mono: Playback 32768 [45%] [-16.00dB] [on]\n";
        assert_eq!(
            parse_volume_output(output).unwrap(),
            MetricValue::Volume {
                percent: 45,
                muted: false
            }
        );
    }

    #[test]
    fn parses_amixer_muted() {
        let output = "Mono: Playback 0 [70%] [off]\n";
        assert_eq!(
            parse_volume_output(output).unwrap(),
            MetricValue::Volume {
                percent: 70,
                muted: true
            }
        );
    }

    #[test]
    fn clamps_boosted_wpctl_volume() {
        assert_eq!(
            parse_volume_output("Volume: 1.25\n").unwrap(),
            MetricValue::Volume {
                percent: 100,
                muted: false
            }
        );
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(parse_volume_output("no such sink\n").is_err());
        assert!(parse_volume_output("").is_err());
    }
}
