//! Fire-and-forget archival of raw readings to PostgreSQL.
//!
//! The archive is a record of everything ingested; the service itself never
//! reads it back. Insert failures are logged and otherwise ignored, so a
//! database outage never affects ingestion.

use anyhow::Result;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::models::Reading;
use crate::schema;

// ---

#[derive(Debug, Clone)]
pub struct Archiver {
    pool: PgPool,
}

impl Archiver {
    // ---
    /// Connect to the archive database and make sure its schema exists.
    pub async fn connect(db_url: &str, max_connections: u32) -> Result<Self> {
        // ---
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to archive database: {}", e))?;

        tracing::info!("Successfully connected to archive database");

        schema::create_schema(&pool).await?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool without touching the schema.
    pub(crate) fn from_pool(pool: PgPool) -> Self {
        Archiver { pool }
    }

    /// Persist `reading` in the background.
    pub fn spawn_archive(&self, reading: Reading) {
        // ---
        let pool = self.pool.clone();
        tokio::spawn(async move {
            if let Err(e) = store_reading(&pool, &reading).await {
                tracing::error!(
                    "Failed to archive reading from {}: {}",
                    reading.device_id(),
                    e
                );
            }
        });
    }
}

async fn store_reading(pool: &PgPool, reading: &Reading) -> Result<()> {
    // ---
    let fields = serde_json::to_string(reading.fields())?;

    sqlx::query(
        r#"
        INSERT INTO reading_archive (id, device_id, received_at, fields)
        VALUES ($1, $2, $3, $4::jsonb)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(reading.device_id())
    .bind(reading.received_at())
    .bind(fields)
    .execute(pool)
    .await?;

    tracing::debug!("Archived reading from {}", reading.device_id());
    Ok(())
}
