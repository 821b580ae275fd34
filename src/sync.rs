//! The resumable, rate-limited sync job.
//!
//! One run walks the series catalog from the persisted checkpoint offset to
//! its end, strictly one series at a time:
//!
//! 1. read the latest stored date for the series,
//! 2. request every observation from the day after it (or from 1900-01-01),
//! 3. upsert what came back, keyed on `(series_id, date)`,
//! 4. persist `offset = index + 1`,
//! 5. sleep the inter-series delay unless this was the last series.
//!
//! A failure in steps 1–3 is logged, recorded in the [`SyncReport`], and the
//! run moves on; the checkpoint still advances, so it tracks series
//! *visited* rather than series *updated*. Only a catalog read failure
//! aborts a run. A checkpoint that cannot be read falls back to offset 0,
//! which is safe because the max-date lookup and upserts make reprocessing
//! idempotent.
//!
//! The job holds no state between runs. It assumes at most one run at a time
//! against a given store; two overlapping runs would race on the offset.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fred_sync_core::models::CHUNK_SIZE;
use fred_sync_core::observation::{observation_start, to_observations};
use fred_sync_core::provider::ObservationProvider;
use fred_sync_core::store::{CheckpointStore, ObservationStore, SeriesCatalog};

use crate::config::{Config, SyncConfig};
use crate::db;
use crate::progress::{ProgressMode, SyncProgressEvent, SyncProgressReporter};
use crate::provider::FredClient;
use crate::sqlite_store::SqliteStore;

/// Tunables for a [`SyncJob`].
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Pause between consecutive series.
    pub inter_item_delay: Duration,
    /// When the stored offset already equals the catalog length, start a
    /// new pass from 0 instead of idling.
    pub restart_completed_cycle: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

impl SyncOptions {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            inter_item_delay: config.inter_item_delay(),
            restart_completed_cycle: config.restart_completed_cycle,
        }
    }
}

/// The step at which a series failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePhase {
    MaxDate,
    Fetch,
    Upsert,
}

impl FailurePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePhase::MaxDate => "max_date",
            FailurePhase::Fetch => "fetch",
            FailurePhase::Upsert => "upsert",
        }
    }
}

impl std::fmt::Display for FailurePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A series that received new observations.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesUpdate {
    pub series_id: String,
    pub index: usize,
    pub observation_start: NaiveDate,
    pub rows: usize,
}

/// A series that could not be brought up to date in this run.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesFailure {
    pub series_id: String,
    pub index: usize,
    pub phase: FailurePhase,
    pub error: String,
}

/// Outcome of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub total_series: usize,
    pub start_offset: usize,
    pub end_offset: usize,
    /// The checkpoint could not be read (or had no row) and offset 0 was used.
    pub checkpoint_fallback: bool,
    /// The previous pass had completed and this run started a new one.
    pub restarted_cycle: bool,
    /// The run stopped early because cancellation was requested.
    pub cancelled: bool,
    pub updated: Vec<SeriesUpdate>,
    pub up_to_date: Vec<String>,
    pub failed: Vec<SeriesFailure>,
    pub checkpoint_write_failures: usize,
}

impl SyncReport {
    /// Total observation rows written.
    pub fn rows_written(&self) -> usize {
        self.updated.iter().map(|u| u.rows).sum()
    }

    /// Number of series visited (updated, current, or failed).
    pub fn visited(&self) -> usize {
        self.updated.len() + self.up_to_date.len() + self.failed.len()
    }
}

/// The sync job with its collaborators injected.
pub struct SyncJob {
    catalog: Arc<dyn SeriesCatalog>,
    observations: Arc<dyn ObservationStore>,
    checkpoint: Arc<dyn CheckpointStore>,
    provider: Arc<dyn ObservationProvider>,
    options: SyncOptions,
}

impl SyncJob {
    pub fn new(
        catalog: Arc<dyn SeriesCatalog>,
        observations: Arc<dyn ObservationStore>,
        checkpoint: Arc<dyn CheckpointStore>,
        provider: Arc<dyn ObservationProvider>,
        options: SyncOptions,
    ) -> Self {
        Self {
            catalog,
            observations,
            checkpoint,
            provider,
            options,
        }
    }

    /// Build a job whose three store collaborators are the same backend.
    pub fn with_store<S>(
        store: Arc<S>,
        provider: Arc<dyn ObservationProvider>,
        options: SyncOptions,
    ) -> Self
    where
        S: SeriesCatalog + ObservationStore + CheckpointStore + 'static,
    {
        Self::new(store.clone(), store.clone(), store, provider, options)
    }

    /// Execute one run.
    ///
    /// `cancel` is checked before each series; once set, the run stops
    /// without touching further series and reports `cancelled = true`.
    ///
    /// # Errors
    ///
    /// Only a failure to read the series catalog is returned as `Err`.
    pub async fn run(
        &self,
        cancel: Option<&AtomicBool>,
        progress: &dyn SyncProgressReporter,
    ) -> Result<SyncReport> {
        let catalog = match self.catalog.list_series().await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(phase = "catalog", error = %format!("{:#}", e), "failed to read series catalog");
                return Err(e.context("failed to read series catalog"));
            }
        };

        let total = catalog.len();
        let mut report = SyncReport {
            total_series: total,
            ..Default::default()
        };

        if total == 0 {
            tracing::info!("series catalog is empty; nothing to sync");
            return Ok(report);
        }

        let (mut offset, fallback) = self.load_offset().await;
        report.checkpoint_fallback = fallback;

        if offset > total {
            tracing::warn!(offset, total, "checkpoint is past the end of the catalog; restarting at 0");
            offset = self.reset_offset(&mut report).await;
        } else if offset == total {
            if !self.options.restart_completed_cycle {
                tracing::info!(offset, total, "catalog pass already complete; nothing to sync");
                report.start_offset = offset;
                report.end_offset = offset;
                return Ok(report);
            }
            tracing::info!(total, "previous catalog pass complete; starting a new pass");
            offset = self.reset_offset(&mut report).await;
        }

        report.start_offset = offset;
        report.end_offset = offset;

        tracing::info!(
            total,
            offset,
            delay_ms = self.options.inter_item_delay.as_millis() as u64,
            "starting sync run"
        );
        progress.report(SyncProgressEvent::Starting {
            total: total as u64,
            offset: offset as u64,
        });

        for (index, series) in catalog.iter().enumerate().skip(offset) {
            if cancel.is_some_and(|c| c.load(Ordering::SeqCst)) {
                tracing::warn!(index, "cancellation requested; stopping before next series");
                report.cancelled = true;
                break;
            }

            let series_id = series.series_id.as_str();
            progress.report(SyncProgressEvent::Series {
                index: index as u64,
                total: total as u64,
                series_id: series_id.to_string(),
            });

            match self.sync_series(index, series_id).await {
                Ok(Some(update)) => report.updated.push(update),
                Ok(None) => report.up_to_date.push(series_id.to_string()),
                Err(failure) => report.failed.push(failure),
            }

            let next = index + CHUNK_SIZE;
            match self.checkpoint.set_offset(next).await {
                Ok(()) => tracing::debug!(offset = next, "checkpoint saved"),
                Err(e) => {
                    tracing::error!(
                        series_id,
                        index,
                        phase = "checkpoint_write",
                        error = %format!("{:#}", e),
                        "failed to save checkpoint"
                    );
                    report.checkpoint_write_failures += 1;
                }
            }
            report.end_offset = next;

            if next < total && !self.options.inter_item_delay.is_zero() {
                tokio::time::sleep(self.options.inter_item_delay).await;
            }
        }

        progress.report(SyncProgressEvent::Finished {
            rows: report.rows_written() as u64,
        });
        tracing::info!(
            visited = report.visited(),
            updated = report.updated.len(),
            failed = report.failed.len(),
            rows = report.rows_written(),
            end_offset = report.end_offset,
            "sync run finished"
        );

        Ok(report)
    }

    /// Read the checkpoint, falling back to 0. Returns `(offset, fell_back)`.
    async fn load_offset(&self) -> (usize, bool) {
        match self.checkpoint.get_offset().await {
            Ok(Some(offset)) => {
                tracing::info!(offset, "read checkpoint");
                (offset, false)
            }
            Ok(None) => {
                tracing::warn!("no checkpoint row found; starting at offset 0");
                (0, true)
            }
            Err(e) => {
                tracing::warn!(
                    phase = "checkpoint_read",
                    error = %format!("{:#}", e),
                    "failed to read checkpoint; starting at offset 0"
                );
                (0, true)
            }
        }
    }

    async fn reset_offset(&self, report: &mut SyncReport) -> usize {
        report.restarted_cycle = true;
        if let Err(e) = self.checkpoint.set_offset(0).await {
            tracing::error!(
                phase = "checkpoint_write",
                error = %format!("{:#}", e),
                "failed to reset checkpoint"
            );
            report.checkpoint_write_failures += 1;
        }
        0
    }

    /// Bring one series up to date. `Ok(None)` means nothing new.
    async fn sync_series(
        &self,
        index: usize,
        series_id: &str,
    ) -> std::result::Result<Option<SeriesUpdate>, SeriesFailure> {
        let fail = |phase: FailurePhase, err: anyhow::Error| {
            let error = format!("{:#}", err);
            tracing::error!(series_id, index, phase = phase.as_str(), error = %error, "series sync failed");
            SeriesFailure {
                series_id: series_id.to_string(),
                index,
                phase,
                error,
            }
        };

        let max_date = self
            .observations
            .max_date(series_id)
            .await
            .map_err(|e| fail(FailurePhase::MaxDate, e))?;

        let start = observation_start(max_date);
        tracing::info!(series_id, index, observation_start = %start, "fetching new observations");

        let points = self
            .provider
            .fetch_observations(series_id, start)
            .await
            .map_err(|e| fail(FailurePhase::Fetch, e))?;

        if points.is_empty() {
            tracing::info!(series_id, index, "no new observations");
            return Ok(None);
        }

        let rows = to_observations(series_id, &points);
        let written = self
            .observations
            .upsert_observations(&rows)
            .await
            .map_err(|e| fail(FailurePhase::Upsert, e))?;

        tracing::info!(series_id, index, rows = written, "upserted observations");
        Ok(Some(SeriesUpdate {
            series_id: series_id.to_string(),
            index,
            observation_start: start,
            rows: written,
        }))
    }
}

/// Build a job over the configured SQLite database and FRED client.
pub async fn build_job(config: &Config, options: SyncOptions) -> Result<(SyncJob, Arc<SqliteStore>)> {
    let pool = db::connect(config).await?;
    let store = Arc::new(SqliteStore::new(pool));
    let provider: Arc<dyn ObservationProvider> = Arc::new(FredClient::from_config(config)?);
    let job = SyncJob::with_store(store.clone(), provider, options);
    Ok((job, store))
}

/// CLI entry point for `fredsync sync`.
pub async fn run_sync(
    config: &Config,
    delay_ms: Option<u64>,
    json: bool,
    progress: ProgressMode,
) -> Result<()> {
    let mut options = SyncOptions::from_config(&config.sync);
    if let Some(ms) = delay_ms {
        options.inter_item_delay = Duration::from_millis(ms);
    }

    let (job, store) = build_job(config, options).await?;
    let reporter = progress.reporter();
    let report = job
        .run(None, reporter.as_ref())
        .await
        .context("sync run failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    store.pool().close().await;
    Ok(())
}

/// Human-readable run summary on stdout.
pub fn print_report(report: &SyncReport) {
    println!("sync");
    println!("  series in catalog: {}", report.total_series);
    println!(
        "  offset: {} -> {}{}",
        report.start_offset,
        report.end_offset,
        if report.restarted_cycle {
            " (new pass)"
        } else {
            ""
        }
    );
    println!("  series visited: {}", report.visited());
    println!("  series updated: {}", report.updated.len());
    println!("  rows upserted: {}", report.rows_written());
    println!("  already current: {}", report.up_to_date.len());
    println!("  failed: {}", report.failed.len());
    for f in &report.failed {
        println!("    {} [{}] {}", f.series_id, f.phase, f.error);
    }
    if report.checkpoint_fallback {
        println!("  checkpoint: unreadable, started at 0");
    }
    if report.checkpoint_write_failures > 0 {
        println!(
            "  checkpoint write failures: {}",
            report.checkpoint_write_failures
        );
    }
    if report.cancelled {
        println!("  cancelled");
    } else {
        println!("ok");
    }
}
