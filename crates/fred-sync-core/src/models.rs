//! Core data models shared by the sync job, the stores, and the read API.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Singleton row id of the sync checkpoint.
pub const CHECKPOINT_ROW_ID: i64 = 1;

/// Number of series processed per checkpointed step.
pub const CHUNK_SIZE: usize = 1;

/// First date requested for a series that has no stored observations.
pub fn epoch_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).expect("1900-01-01 is a valid date")
}

/// One tracked series in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesDescriptor {
    pub series_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SeriesDescriptor {
    pub fn new(series_id: impl Into<String>) -> Self {
        Self {
            series_id: series_id.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A stored data point, identified by `(series_id, date)`.
///
/// `value: None` is a withheld or missing reading. It is kept as `NULL`
/// in the store and must not be read back as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub series_id: String,
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// A point as returned by the provider, before value parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderObservation {
    pub date: NaiveDate,
    pub raw_value: String,
}

/// Persisted resumption position in the series catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncCheckpoint {
    pub id: i64,
    pub current_offset: usize,
}
