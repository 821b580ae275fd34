//! Catalog administration and stored-observation lookup.
//!
//! The catalog is the list of series the sync job walks. These functions
//! back both the `fredsync series …` / `fredsync observations` commands and
//! the `/series` HTTP endpoints.

use anyhow::{bail, Result};
use serde::Serialize;

use fred_sync_core::models::{Observation, SeriesDescriptor};
use fred_sync_core::segment::{plottable, segments, Segment};
use fred_sync_core::store::{ObservationStore, SeriesCatalog};

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Result cap for catalog searches when none is given.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Stored rows for one series plus their plottable shape.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesObservations {
    pub series_id: String,
    pub observations: Vec<Observation>,
    pub segments: Vec<Segment>,
    pub plottable: bool,
}

/// Trim and check a series identifier before it enters the catalog.
pub fn validate_series_id(series_id: &str) -> Result<String> {
    let id = series_id.trim();
    if id.is_empty() {
        bail!("series id must not be empty");
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!(
            "invalid series id '{}': only ASCII letters, digits and '_' are allowed",
            id
        );
    }
    Ok(id.to_string())
}

/// List the catalog, or search it when `term` is non-blank.
pub async fn find_series(
    catalog: &dyn SeriesCatalog,
    term: Option<&str>,
    limit: usize,
) -> Result<Vec<SeriesDescriptor>> {
    match term.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => catalog.search_series(t, limit).await,
        None => {
            let mut all = catalog.list_series().await?;
            all.truncate(limit);
            Ok(all)
        }
    }
}

/// Load the stored observations of a catalog series.
///
/// Returns `None` when `series_id` is not in the catalog.
pub async fn load_observations(
    catalog: &dyn SeriesCatalog,
    store: &dyn ObservationStore,
    series_id: &str,
) -> Result<Option<SeriesObservations>> {
    let known = catalog
        .list_series()
        .await?
        .iter()
        .any(|s| s.series_id == series_id);
    if !known {
        return Ok(None);
    }

    let observations = store.observations(series_id).await?;
    Ok(Some(SeriesObservations {
        series_id: series_id.to_string(),
        segments: segments(&observations),
        plottable: plottable(&observations),
        observations,
    }))
}

async fn open_store(config: &Config) -> Result<SqliteStore> {
    Ok(SqliteStore::new(db::connect(config).await?))
}

/// CLI entry point for `fredsync series add`.
pub async fn run_series_add(
    config: &Config,
    series_id: &str,
    description: Option<&str>,
) -> Result<()> {
    let id = validate_series_id(series_id)?;
    let mut series = SeriesDescriptor::new(&id);
    if let Some(d) = description {
        series = series.with_description(d);
    }

    let store = open_store(config).await?;
    store.add_series(&series).await?;
    store.pool().close().await;

    println!("Added series {}", id);
    Ok(())
}

/// CLI entry point for `fredsync series remove`.
///
/// Stored observations are kept; only the catalog entry goes.
pub async fn run_series_remove(config: &Config, series_id: &str) -> Result<()> {
    let store = open_store(config).await?;
    let removed = store.remove_series(series_id.trim()).await?;
    store.pool().close().await;

    if !removed {
        bail!("series not found: {}", series_id.trim());
    }
    println!("Removed series {}", series_id.trim());
    Ok(())
}

/// CLI entry point for `fredsync series list` and `fredsync series search`.
pub async fn run_series_list(config: &Config, term: Option<&str>, limit: usize) -> Result<()> {
    let store = open_store(config).await?;
    let found = find_series(&store, term, limit).await?;
    store.pool().close().await;

    if found.is_empty() {
        println!("No series.");
        return Ok(());
    }

    println!("{:<24} DESCRIPTION", "SERIES");
    for s in &found {
        println!(
            "{:<24} {}",
            s.series_id,
            s.description.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

/// CLI entry point for `fredsync observations`.
pub async fn run_observations(config: &Config, series_id: &str, json: bool) -> Result<()> {
    let store = open_store(config).await?;
    let loaded = load_observations(&store, &store, series_id.trim()).await?;
    store.pool().close().await;

    let data = match loaded {
        Some(d) => d,
        None => bail!("series not found: {}", series_id.trim()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("--- {} ({} rows) ---", data.series_id, data.observations.len());
    for obs in &data.observations {
        match obs.value {
            Some(v) => println!("{}  {}", obs.date, v),
            None => println!("{}  .", obs.date),
        }
    }
    println!();

    println!("--- Segments ({}) ---", data.segments.len());
    for seg in &data.segments {
        if let (Some(start), Some(end)) = (seg.start(), seg.end()) {
            println!("{} .. {}  ({} points)", start, end, seg.points.len());
        }
    }
    if !data.plottable {
        println!("not enough readings to plot");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fred_sync_core::store::memory::InMemoryStore;

    #[test]
    fn test_validate_series_id() {
        assert_eq!(validate_series_id("  GDP ").unwrap(), "GDP");
        assert_eq!(validate_series_id("T10Y2Y").unwrap(), "T10Y2Y");
        assert!(validate_series_id("").is_err());
        assert!(validate_series_id("   ").is_err());
        assert!(validate_series_id("GDP; DROP").is_err());
    }

    #[tokio::test]
    async fn test_find_series_blank_term_lists() {
        let store = InMemoryStore::with_series(["UNRATE", "GDP", "GDPC1"]);
        let all = find_series(&store, Some("  "), 10).await.unwrap();
        assert_eq!(all.len(), 3);

        let capped = find_series(&store, None, 2).await.unwrap();
        assert_eq!(capped.len(), 2);

        let hits = find_series(&store, Some("gdp"), 10).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|s| s.series_id.as_str()).collect();
        assert_eq!(ids, vec!["GDP", "GDPC1"]);
    }

    #[tokio::test]
    async fn test_load_observations_unknown_series() {
        let store = InMemoryStore::with_series(["GDP"]);
        assert!(load_observations(&store, &store, "UNRATE")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_load_observations_segments() {
        let store = InMemoryStore::with_series(["GDP"]);
        let d = |m| NaiveDate::from_ymd_opt(2020, m, 1).unwrap();
        store
            .upsert_observations(&[
                Observation {
                    series_id: "GDP".into(),
                    date: d(1),
                    value: Some(1.0),
                },
                Observation {
                    series_id: "GDP".into(),
                    date: d(2),
                    value: None,
                },
                Observation {
                    series_id: "GDP".into(),
                    date: d(3),
                    value: Some(3.0),
                },
            ])
            .await
            .unwrap();

        let data = load_observations(&store, &store, "GDP")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(data.observations.len(), 3);
        assert_eq!(data.segments.len(), 2);
        assert!(data.plottable);
    }
}
