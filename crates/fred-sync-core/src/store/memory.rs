//! In-memory store implementation for tests and embedding.
//!
//! Uses `BTreeMap`s behind `std::sync::RwLock`. Observations are keyed by
//! `(series_id, date)` so ordering and upsert semantics match the SQLite
//! store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{Observation, SeriesDescriptor, SyncCheckpoint, CHECKPOINT_ROW_ID};

use super::{CheckpointStore, ObservationStore, SeriesCatalog};

/// In-memory store implementing all three store traits.
pub struct InMemoryStore {
    series: RwLock<BTreeMap<String, Option<String>>>,
    rows: RwLock<BTreeMap<(String, NaiveDate), Option<f64>>>,
    checkpoint: RwLock<Option<SyncCheckpoint>>,
    rows_written: AtomicUsize,
}

impl InMemoryStore {
    /// Empty store with the checkpoint row seeded at offset 0.
    pub fn new() -> Self {
        Self {
            series: RwLock::new(BTreeMap::new()),
            rows: RwLock::new(BTreeMap::new()),
            checkpoint: RwLock::new(Some(SyncCheckpoint {
                id: CHECKPOINT_ROW_ID,
                current_offset: 0,
            })),
            rows_written: AtomicUsize::new(0),
        }
    }

    /// Store tracking `series_ids`, with the checkpoint at offset 0.
    pub fn with_series<I, S>(series_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        {
            let mut series = store.series.write().unwrap();
            for id in series_ids {
                series.insert(id.into(), None);
            }
        }
        store
    }

    /// Drop the checkpoint row entirely.
    pub fn clear_checkpoint(&self) {
        *self.checkpoint.write().unwrap() = None;
    }

    /// Total rows passed to successful upserts since creation.
    pub fn rows_written(&self) -> usize {
        self.rows_written.load(Ordering::SeqCst)
    }

    /// Number of distinct stored `(series_id, date)` rows.
    pub fn row_count(&self) -> usize {
        self.rows.read().unwrap().len()
    }

    /// Stored value for one row; outer `None` means the row does not exist.
    pub fn value(&self, series_id: &str, date: NaiveDate) -> Option<Option<f64>> {
        self.rows
            .read()
            .unwrap()
            .get(&(series_id.to_string(), date))
            .copied()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SeriesCatalog for InMemoryStore {
    async fn list_series(&self) -> Result<Vec<SeriesDescriptor>> {
        let series = self.series.read().unwrap();
        Ok(series
            .iter()
            .map(|(id, description)| SeriesDescriptor {
                series_id: id.clone(),
                description: description.clone(),
            })
            .collect())
    }

    async fn search_series(&self, term: &str, limit: usize) -> Result<Vec<SeriesDescriptor>> {
        let needle = term.trim().to_lowercase();
        let series = self.series.read().unwrap();
        Ok(series
            .iter()
            .filter(|(id, _)| id.to_lowercase().contains(&needle))
            .take(limit)
            .map(|(id, description)| SeriesDescriptor {
                series_id: id.clone(),
                description: description.clone(),
            })
            .collect())
    }

    async fn add_series(&self, series: &SeriesDescriptor) -> Result<()> {
        self.series
            .write()
            .unwrap()
            .insert(series.series_id.clone(), series.description.clone());
        Ok(())
    }

    async fn remove_series(&self, series_id: &str) -> Result<bool> {
        Ok(self.series.write().unwrap().remove(series_id).is_some())
    }
}

#[async_trait]
impl ObservationStore for InMemoryStore {
    async fn max_date(&self, series_id: &str) -> Result<Option<NaiveDate>> {
        let rows = self.rows.read().unwrap();
        Ok(rows
            .keys()
            .filter(|(id, _)| id == series_id)
            .map(|(_, date)| *date)
            .max())
    }

    async fn upsert_observations(&self, rows: &[Observation]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut stored = self.rows.write().unwrap();
        for row in rows {
            stored.insert((row.series_id.clone(), row.date), row.value);
        }
        self.rows_written.fetch_add(rows.len(), Ordering::SeqCst);
        Ok(rows.len())
    }

    async fn observations(&self, series_id: &str) -> Result<Vec<Observation>> {
        let rows = self.rows.read().unwrap();
        Ok(rows
            .iter()
            .filter(|((id, _), _)| id == series_id)
            .map(|((id, date), value)| Observation {
                series_id: id.clone(),
                date: *date,
                value: *value,
            })
            .collect())
    }
}

#[async_trait]
impl CheckpointStore for InMemoryStore {
    async fn get_offset(&self) -> Result<Option<usize>> {
        Ok(self.checkpoint.read().unwrap().map(|c| c.current_offset))
    }

    async fn set_offset(&self, offset: usize) -> Result<()> {
        *self.checkpoint.write().unwrap() = Some(SyncCheckpoint {
            id: CHECKPOINT_ROW_ID,
            current_offset: offset,
        });
        Ok(())
    }
}
