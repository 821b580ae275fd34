//! Periodic trigger for the sync job.
//!
//! Runs the job every `schedule.interval_secs`. Runs never overlap: the next
//! tick is only awaited after the current run returns, and ticks missed
//! while a run was in progress are skipped rather than queued.
//!
//! Ctrl-C sets the job's cancel flag. A run in progress finishes the series
//! it is on, persists the checkpoint, and stops; the scheduler then exits.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;

use crate::config::Config;
use crate::progress::NoProgress;
use crate::sync::{build_job, print_report, SyncJob, SyncOptions};

/// Run `job` every `interval` until `shutdown` is set.
///
/// `wake` interrupts the idle wait between ticks; set `shutdown` before
/// notifying it. A fatal run error (catalog unreadable) is logged and the
/// scheduler keeps going; the next tick retries. Returns the number of runs.
pub async fn run_every(
    job: &SyncJob,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
) -> usize {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut runs = 0usize;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = wake.notified() => {}
        }
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        runs += 1;
        match job.run(Some(shutdown.as_ref()), &NoProgress).await {
            Ok(report) => {
                tracing::info!(
                    run = runs,
                    rows = report.rows_written(),
                    failed = report.failed.len(),
                    "scheduled run complete"
                );
            }
            Err(e) => {
                tracing::error!(run = runs, error = %format!("{:#}", e), "scheduled run failed");
            }
        }

        if shutdown.load(Ordering::SeqCst) {
            break;
        }
    }

    runs
}

/// CLI entry point for `fredsync schedule`.
pub async fn run_schedule(config: &Config, once: bool) -> Result<()> {
    let (job, store) = build_job(config, SyncOptions::from_config(&config.sync)).await?;

    if once {
        let report = job.run(None, &NoProgress).await?;
        print_report(&report);
        store.pool().close().await;
        return Ok(());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let wake = Arc::new(Notify::new());
    {
        let shutdown = shutdown.clone();
        let wake = wake.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested; finishing current series");
                shutdown.store(true, Ordering::SeqCst);
                wake.notify_one();
            }
        });
    }

    let interval = Duration::from_secs(config.schedule.interval_secs);
    tracing::info!(interval_secs = config.schedule.interval_secs, "scheduler started");

    let runs = run_every(&job, interval, shutdown, wake).await;
    tracing::info!(runs, "scheduler stopped");

    store.pool().close().await;
    Ok(())
}
