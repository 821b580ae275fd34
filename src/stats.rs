//! Database status overview.
//!
//! Summarises what the sync job has stored: catalog size, the checkpoint
//! position and when it last moved, and per-series row counts, null
//! counts, and latest dates. Used by `fredsync status` to check that
//! scheduled runs are making progress.

use anyhow::Result;
use sqlx::Row;

use fred_sync_core::models::CHECKPOINT_ROW_ID;

use crate::config::Config;
use crate::db;

/// Per-series breakdown.
struct SeriesStats {
    series_id: String,
    row_count: i64,
    null_count: i64,
    latest: Option<String>,
}

/// Run the status command: query the database and print a summary.
pub async fn run_status(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_series: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM economic_indicators")
        .fetch_one(&pool)
        .await?;

    let total_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fred_data")
        .fetch_one(&pool)
        .await?;

    let checkpoint =
        sqlx::query("SELECT current_offset, updated_at FROM function_state WHERE id = ?")
            .bind(CHECKPOINT_ROW_ID)
            .fetch_optional(&pool)
            .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("fred-sync status");
    println!("=================");
    println!();
    println!("  Database:     {}", config.db.path.display());
    println!("  Size:         {}", format_bytes(db_size));
    println!();
    println!("  Series:       {}", total_series);
    println!("  Observations: {}", total_rows);
    match &checkpoint {
        Some(row) => {
            let offset: i64 = row.get("current_offset");
            let updated_at: i64 = row.get("updated_at");
            println!(
                "  Checkpoint:   {} / {} (updated {})",
                offset,
                total_series,
                format_ts_relative(updated_at)
            );
        }
        None => println!("  Checkpoint:   none (run `fredsync init`)"),
    }

    // Per-series breakdown, catalog order
    let rows = sqlx::query(
        r#"
        SELECT
            e.series_id,
            COUNT(f.date) AS row_count,
            SUM(CASE WHEN f.date IS NOT NULL AND f.value IS NULL THEN 1 ELSE 0 END) AS null_count,
            MAX(f.date) AS latest
        FROM economic_indicators e
        LEFT JOIN fred_data f ON f.series_id = e.series_id
        GROUP BY e.series_id
        ORDER BY e.series_id ASC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let series_stats: Vec<SeriesStats> = rows
        .iter()
        .map(|row| SeriesStats {
            series_id: row.get("series_id"),
            row_count: row.get("row_count"),
            null_count: row.get::<Option<i64>, _>("null_count").unwrap_or(0),
            latest: row.get("latest"),
        })
        .collect();

    if !series_stats.is_empty() {
        println!();
        println!("  By series:");
        println!(
            "  {:<24} {:>8} {:>6}   {}",
            "SERIES", "ROWS", "NULLS", "LATEST"
        );
        println!("  {}", "-".repeat(56));

        for s in &series_stats {
            println!(
                "  {:<24} {:>8} {:>6}   {}",
                s.series_id,
                s.row_count,
                s.null_count,
                s.latest.as_deref().unwrap_or("never")
            );
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_relative_time() {
        let now = chrono::Utc::now().timestamp();
        assert_eq!(format_ts_relative(now), "just now");
        assert_eq!(format_ts_relative(now - 120), "2 mins ago");
        assert_eq!(format_ts_relative(now - 3600), "1 hour ago");
        assert_eq!(format_ts_relative(now - 3 * 86400), "3 days ago");
    }
}
