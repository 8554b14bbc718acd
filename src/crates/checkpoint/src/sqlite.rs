//! `SqliteCheckpointSaver` (§4.8.5, §6.4): `sqlx`-backed durable checkpoint log. Schema per
//! §6.4: a single `checkpoints` table keyed by `(run_id, cycle, inference_count)` holding the
//! JSON-serialized snapshot from §4.8.1; `list_runs` aggregates over it rather than maintaining
//! a separate run index.

use crate::error::{CheckpointError, Result};
use crate::saver::CheckpointSaver;
use crate::types::{Checkpoint, RunSummary};
use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};

pub struct SqliteCheckpointSaver {
    pool: SqlitePool,
}

impl SqliteCheckpointSaver {
    pub async fn connect(db_path: &str) -> Result<Self> {
        let url = format!("sqlite://{db_path}?mode=rwc");
        let pool = SqlitePoolOptions::new().max_connections(5).connect(&url).await?;
        let saver = Self { pool };
        saver.migrate().await?;
        Ok(saver)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                run_id TEXT NOT NULL,
                cycle INTEGER NOT NULL,
                inference_count INTEGER NOT NULL,
                at TEXT NOT NULL,
                snapshot TEXT NOT NULL,
                PRIMARY KEY (run_id, cycle, inference_count)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn decode(row: &sqlx::sqlite::SqliteRow) -> Result<Checkpoint> {
        let snapshot: String = row.try_get("snapshot")?;
        serde_json::from_str(&snapshot).map_err(CheckpointError::from)
    }
}

#[async_trait]
impl CheckpointSaver for SqliteCheckpointSaver {
    async fn put(&self, checkpoint: Checkpoint) -> Result<()> {
        let snapshot = serde_json::to_string(&checkpoint)?;
        sqlx::query(
            "INSERT OR REPLACE INTO checkpoints (run_id, cycle, inference_count, at, snapshot) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&checkpoint.run_id)
        .bind(checkpoint.cycle as i64)
        .bind(checkpoint.inference_count as i64)
        .bind(checkpoint.at.to_rfc3339())
        .bind(snapshot)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest(&self, run_id: &str) -> Result<Option<Checkpoint>> {
        let row = sqlx::query(
            "SELECT snapshot FROM checkpoints WHERE run_id = ? \
             ORDER BY cycle DESC, inference_count DESC LIMIT 1",
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::decode).transpose()
    }

    async fn get(&self, run_id: &str, cycle: u64, inference_count: u64) -> Result<Option<Checkpoint>> {
        let row = sqlx::query(
            "SELECT snapshot FROM checkpoints WHERE run_id = ? AND cycle = ? AND inference_count = ?",
        )
        .bind(run_id)
        .bind(cycle as i64)
        .bind(inference_count as i64)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::decode).transpose()
    }

    async fn list_checkpoints(&self, run_id: &str) -> Result<Vec<Checkpoint>> {
        let rows = sqlx::query(
            "SELECT snapshot FROM checkpoints WHERE run_id = ? ORDER BY cycle ASC, inference_count ASC",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::decode).collect()
    }

    async fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let rows = sqlx::query(
            "SELECT run_id, MIN(at) AS first_at, MAX(at) AS last_at, COUNT(*) AS n, MAX(cycle) AS max_cycle \
             FROM checkpoints GROUP BY run_id ORDER BY last_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let first_at: String = row.try_get("first_at")?;
                let last_at: String = row.try_get("last_at")?;
                Ok(RunSummary {
                    run_id: row.try_get("run_id")?,
                    first_at: chrono::DateTime::parse_from_rfc3339(&first_at)
                        .map_err(|e| CheckpointError::Invalid(e.to_string()))?
                        .with_timezone(&chrono::Utc),
                    last_at: chrono::DateTime::parse_from_rfc3339(&last_at)
                        .map_err(|e| CheckpointError::Invalid(e.to_string()))?
                        .with_timezone(&chrono::Utc),
                    execution_count: row.try_get::<i64, _>("n")? as u64,
                    max_cycle: row.try_get::<i64, _>("max_cycle")? as u64,
                })
            })
            .collect()
    }
}
