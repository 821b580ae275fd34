//! Database schema migrations (idempotent).
//!
//! | Table | Purpose |
//! |-------|---------|
//! | `economic_indicators` | series catalog |
//! | `fred_data` | observations, primary key `(series_id, date)` |
//! | `function_state` | singleton sync checkpoint (`id = 1`) |

use anyhow::Result;
use sqlx::SqlitePool;

use fred_sync_core::models::CHECKPOINT_ROW_ID;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Apply the schema to an open pool. Safe to run repeatedly; an existing
/// checkpoint offset is preserved.
pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS economic_indicators (
            series_id TEXT PRIMARY KEY,
            description TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Dates are ISO-8601 text so that MAX(date) orders chronologically.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fred_data (
            series_id TEXT NOT NULL,
            date TEXT NOT NULL,
            value REAL,
            PRIMARY KEY (series_id, date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS function_state (
            id INTEGER PRIMARY KEY,
            current_offset INTEGER NOT NULL DEFAULT 0,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT OR IGNORE INTO function_state (id, current_offset, updated_at) VALUES (?, 0, ?)",
    )
    .bind(CHECKPOINT_ROW_ID)
    .bind(chrono::Utc::now().timestamp())
    .execute(pool)
    .await?;

    Ok(())
}
