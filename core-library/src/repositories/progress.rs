//! Sync-progress repository trait and SQLite implementation
//!
//! The progress counter is the only mutable state shared between fan-out
//! units of work. Concurrent units may finish at nearly the same instant,
//! so the increment must be a single read-modify-write at the store level:
//! two units must never both observe "I am last", and the trigger
//! observation must never be lost. `UPDATE ... RETURNING` gives exactly
//! that on SQLite.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::{LibraryError, Result};
use crate::models::SyncProgress;

/// Sync-progress data access operations
#[async_trait]
pub trait SyncProgressRepository: Send + Sync {
    /// Create or reset the progress row for a run: zero completed,
    /// `expected` units outstanding.
    async fn reset(&self, run_id: &str, expected: i64) -> Result<()>;

    /// Atomically increment `completed` and return
    /// `(completed, expected)` as observed by this increment.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::NotFound`] when no progress row exists for
    /// `run_id` (the run was never reset).
    async fn increment_and_get(&self, run_id: &str) -> Result<(i64, i64)>;

    /// Read the current progress row, if any
    async fn get(&self, run_id: &str) -> Result<Option<SyncProgress>>;
}

/// SQLite implementation of [`SyncProgressRepository`]
pub struct SqliteSyncProgressRepository {
    pool: SqlitePool,
}

impl SqliteSyncProgressRepository {
    /// Create a new repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the sync_progress table if it doesn't exist
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sync_progress (
                run_id TEXT PRIMARY KEY,
                completed INTEGER NOT NULL DEFAULT 0,
                expected INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SyncProgressRepository for SqliteSyncProgressRepository {
    async fn reset(&self, run_id: &str, expected: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_progress (run_id, completed, expected, updated_at)
            VALUES (?, 0, ?, ?)
            ON CONFLICT(run_id) DO UPDATE SET
                completed = 0,
                expected = excluded.expected,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(run_id)
        .bind(expected)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        debug!(run_id = %run_id, expected, "Reset sync progress");
        Ok(())
    }

    async fn increment_and_get(&self, run_id: &str) -> Result<(i64, i64)> {
        let row = sqlx::query(
            r#"
            UPDATE sync_progress
            SET completed = completed + 1, updated_at = ?
            WHERE run_id = ?
            RETURNING completed, expected
            "#,
        )
        .bind(Utc::now().timestamp())
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| LibraryError::NotFound {
            entity_type: "SyncProgress".to_string(),
            id: run_id.to_string(),
        })?;

        Ok((row.get("completed"), row.get("expected")))
    }

    async fn get(&self, run_id: &str) -> Result<Option<SyncProgress>> {
        let row = sqlx::query(
            "SELECT run_id, completed, expected, updated_at FROM sync_progress WHERE run_id = ?",
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| SyncProgress {
            run_id: row.get("run_id"),
            completed: row.get("completed"),
            expected: row.get("expected"),
            updated_at: row.get("updated_at"),
        }))
    }
}
