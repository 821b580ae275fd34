//! Sync progress reporting.
//!
//! Reports observable progress during `fredsync sync` so operators see which
//! series is being fetched and how far through the catalog the run is.
//! Progress is emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for a sync run.
#[derive(Clone, Debug)]
pub enum SyncProgressEvent {
    /// Run started at `offset` of a catalog of `total` series.
    Starting { total: u64, offset: u64 },
    /// About to process the series at `index` (0-based).
    Series {
        index: u64,
        total: u64,
        series_id: String,
    },
    /// Run finished after writing `rows` observations.
    Finished { rows: u64 },
}

/// Reports sync progress. Implementations write to stderr (human or JSON).
pub trait SyncProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the sync loop.
    fn report(&self, event: SyncProgressEvent);
}

/// Human-friendly progress on stderr: "sync  12 / 140  UNRATE".
pub struct StderrProgress;

impl SyncProgressReporter for StderrProgress {
    fn report(&self, event: SyncProgressEvent) {
        let line = match &event {
            SyncProgressEvent::Starting { total, offset } => format!(
                "sync  starting at {} of {} series\n",
                format_number(*offset),
                format_number(*total)
            ),
            SyncProgressEvent::Series {
                index,
                total,
                series_id,
            } => format!(
                "sync  {} / {}  {}\n",
                format_number(index + 1),
                format_number(*total),
                series_id
            ),
            SyncProgressEvent::Finished { rows } => {
                format!("sync  done, {} rows written\n", format_number(*rows))
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl SyncProgressReporter for JsonProgress {
    fn report(&self, event: SyncProgressEvent) {
        let obj = match &event {
            SyncProgressEvent::Starting { total, offset } => serde_json::json!({
                "event": "progress",
                "phase": "starting",
                "offset": offset,
                "total": total
            }),
            SyncProgressEvent::Series {
                index,
                total,
                series_id,
            } => serde_json::json!({
                "event": "progress",
                "phase": "series",
                "index": index,
                "total": total,
                "series_id": series_id
            }),
            SyncProgressEvent::Finished { rows } => serde_json::json!({
                "event": "progress",
                "phase": "finished",
                "rows": rows
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl SyncProgressReporter for NoProgress {
    fn report(&self, _event: SyncProgressEvent) {}
}

pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Parse a `--progress` value; `None` picks [`Self::default_for_tty`].
    pub fn from_flag(flag: Option<&str>) -> anyhow::Result<Self> {
        match flag {
            None => Ok(Self::default_for_tty()),
            Some("off") => Ok(ProgressMode::Off),
            Some("human") => Ok(ProgressMode::Human),
            Some("json") => Ok(ProgressMode::Json),
            Some(other) => anyhow::bail!(
                "Unknown progress mode: '{}'. Must be off, human, or json.",
                other
            ),
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn SyncProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn progress_flag_values() {
        assert_eq!(ProgressMode::from_flag(Some("json")).unwrap(), ProgressMode::Json);
        assert_eq!(ProgressMode::from_flag(Some("off")).unwrap(), ProgressMode::Off);
        assert!(ProgressMode::from_flag(Some("loud")).is_err());
    }
}
