//! SQLite-backed store.
//!
//! Implements [`SeriesCatalog`], [`ObservationStore`], and
//! [`CheckpointStore`] over the schema created by [`crate::migrate`].
//! Dates are stored as `YYYY-MM-DD` text.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};

use fred_sync_core::models::{Observation, SeriesDescriptor, CHECKPOINT_ROW_ID};
use fred_sync_core::store::{CheckpointStore, ObservationStore, SeriesCatalog};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite implementation of the store traits.
///
/// Wraps a [`SqlitePool`]; cloning the pool is cheap, so one store can be
/// shared as all three collaborators of the sync job.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .with_context(|| format!("invalid stored date: {}", s))
}

fn format_date(d: NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

#[async_trait]
impl SeriesCatalog for SqliteStore {
    async fn list_series(&self) -> Result<Vec<SeriesDescriptor>> {
        let rows = sqlx::query(
            "SELECT series_id, description FROM economic_indicators ORDER BY series_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| SeriesDescriptor {
                series_id: row.get("series_id"),
                description: row.get("description"),
            })
            .collect())
    }

    async fn search_series(&self, term: &str, limit: usize) -> Result<Vec<SeriesDescriptor>> {
        // SQLite LIKE is case-insensitive for ASCII.
        let pattern = format!("%{}%", term.trim());
        let rows = sqlx::query(
            r#"
            SELECT series_id, description FROM economic_indicators
            WHERE series_id LIKE ?
            ORDER BY series_id ASC
            LIMIT ?
            "#,
        )
        .bind(pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| SeriesDescriptor {
                series_id: row.get("series_id"),
                description: row.get("description"),
            })
            .collect())
    }

    async fn add_series(&self, series: &SeriesDescriptor) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO economic_indicators (series_id, description) VALUES (?, ?)
            ON CONFLICT(series_id) DO UPDATE SET description = excluded.description
            "#,
        )
        .bind(&series.series_id)
        .bind(&series.description)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_series(&self, series_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM economic_indicators WHERE series_id = ?")
            .bind(series_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ObservationStore for SqliteStore {
    async fn max_date(&self, series_id: &str) -> Result<Option<NaiveDate>> {
        let max: Option<String> =
            sqlx::query_scalar("SELECT MAX(date) FROM fred_data WHERE series_id = ?")
                .bind(series_id)
                .fetch_one(&self.pool)
                .await?;

        max.as_deref().map(parse_date).transpose()
    }

    async fn upsert_observations(&self, rows: &[Observation]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO fred_data (series_id, date, value) VALUES (?, ?, ?)
                ON CONFLICT(series_id, date) DO UPDATE SET value = excluded.value
                "#,
            )
            .bind(&row.series_id)
            .bind(format_date(row.date))
            .bind(row.value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(rows.len())
    }

    async fn observations(&self, series_id: &str) -> Result<Vec<Observation>> {
        let rows = sqlx::query(
            "SELECT series_id, date, value FROM fred_data WHERE series_id = ? ORDER BY date ASC",
        )
        .bind(series_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let date: String = row.get("date");
                Ok(Observation {
                    series_id: row.get("series_id"),
                    date: parse_date(&date)?,
                    value: row.get("value"),
                })
            })
            .collect()
    }
}

#[async_trait]
impl CheckpointStore for SqliteStore {
    async fn get_offset(&self) -> Result<Option<usize>> {
        let offset: Option<i64> =
            sqlx::query_scalar("SELECT current_offset FROM function_state WHERE id = ?")
                .bind(CHECKPOINT_ROW_ID)
                .fetch_optional(&self.pool)
                .await?;

        offset
            .map(|o| usize::try_from(o).map_err(|_| anyhow!("negative checkpoint offset: {}", o)))
            .transpose()
    }

    async fn set_offset(&self, offset: usize) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO function_state (id, current_offset, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                current_offset = excluded.current_offset,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(CHECKPOINT_ROW_ID)
        .bind(offset as i64)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
