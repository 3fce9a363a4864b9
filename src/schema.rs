//! Database schema management for the reading archive.
//!
//! Ensures the archive table and its index exist before any reading is
//! archived. Applied once on startup from `main.rs`, only when a
//! `DATABASE_URL` is configured.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create the archive schema (idempotent).
///
/// Safe to call on every startup; no-op if the objects already exist.
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Raw readings, one row per ingestion event
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reading_archive (
            id          UUID        PRIMARY KEY,
            device_id   TEXT        NOT NULL,
            received_at TIMESTAMPTZ NOT NULL,
            fields      JSONB       NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_reading_archive_device_time
            ON reading_archive (device_id, received_at);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
