//! Storage abstraction for fred-sync.
//!
//! The sync job talks to its store through three narrow traits so that
//! each collaborator can be faked independently in tests:
//!
//! | Trait | Backing table (SQLite) | Used for |
//! |-------|------------------------|----------|
//! | [`SeriesCatalog`] | `economic_indicators` | which series to sync |
//! | [`ObservationStore`] | `fred_data` | low-water mark and upserts |
//! | [`CheckpointStore`] | `function_state` | resumption offset |
//!
//! A single backend usually implements all three; see
//! [`memory::InMemoryStore`] and the SQLite store in the `fred-sync` package.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{Observation, SeriesDescriptor};

/// The list of tracked series.
#[async_trait]
pub trait SeriesCatalog: Send + Sync {
    /// All tracked series in stable catalog order (ascending `series_id`).
    ///
    /// The checkpoint offset indexes into this list, so the order must not
    /// change between runs unless the catalog itself changes.
    async fn list_series(&self) -> Result<Vec<SeriesDescriptor>>;

    /// Case-insensitive substring search on `series_id`, at most `limit` hits.
    async fn search_series(&self, term: &str, limit: usize) -> Result<Vec<SeriesDescriptor>>;

    /// Insert a series, or update its description if already tracked.
    async fn add_series(&self, series: &SeriesDescriptor) -> Result<()>;

    /// Stop tracking a series. Stored observations are kept.
    ///
    /// Returns `false` if the series was not tracked.
    async fn remove_series(&self, series_id: &str) -> Result<bool>;
}

/// Stored observations, keyed by `(series_id, date)`.
#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// Latest stored date for `series_id`, or `None` if it has no rows.
    async fn max_date(&self, series_id: &str) -> Result<Option<NaiveDate>>;

    /// Insert rows, replacing `value` where `(series_id, date)` already exists.
    ///
    /// Returns the number of rows written. An empty batch is a no-op.
    async fn upsert_observations(&self, rows: &[Observation]) -> Result<usize>;

    /// All rows for `series_id`, ascending by date.
    async fn observations(&self, series_id: &str) -> Result<Vec<Observation>>;
}

/// The singleton resumption offset.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Current offset, or `None` when no checkpoint row exists.
    async fn get_offset(&self) -> Result<Option<usize>>;

    /// Persist `offset` as the index of the next series to visit.
    async fn set_offset(&self, offset: usize) -> Result<()>;
}
