//! Episode repository trait and SQLite implementation
//!
//! Episodes are written through three narrow paths: batched inserts for
//! first sightings, batched sync-field updates for known rows, and the
//! conditional played-at update that enforces the forward-only timestamp
//! invariant at the SQL level.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use tracing::debug;

use crate::error::Result;
use crate::models::{datetime_from_millis, Episode, EpisodeSyncUpdate, NewEpisode};
use crate::repositories::sql_placeholders;

/// Episode data access operations
#[async_trait]
pub trait EpisodeRepository: Send + Sync {
    /// Which of the given uuids already exist in the store.
    ///
    /// A single batched membership query; an empty input returns an empty
    /// set without touching the database.
    async fn existing_uuids(&self, uuids: &[String]) -> Result<HashSet<String>>;

    /// Insert first-sighting episodes. Rows that raced into existence since
    /// the existence check are left untouched (idempotent under
    /// redelivery). An empty batch is a no-op.
    async fn insert_batch(&self, episodes: &[NewEpisode]) -> Result<()>;

    /// Update mutable sync fields on known episodes. Metadata columns are
    /// not written. An empty batch is a no-op.
    async fn update_sync_fields_batch(&self, updates: &[EpisodeSyncUpdate]) -> Result<()>;

    /// Set `played_at` only if the stored value is null or strictly earlier.
    ///
    /// Returns `true` when a row was updated; `false` when the episode does
    /// not exist or the stored timestamp is already at least `played_at`.
    async fn update_played_at_if_newer(
        &self,
        uuid: &str,
        played_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Find an episode by its uuid
    async fn find_by_uuid(&self, uuid: &str) -> Result<Option<Episode>>;

    /// Count stored episodes
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of [`EpisodeRepository`]
pub struct SqliteEpisodeRepository {
    pool: SqlitePool,
}

impl SqliteEpisodeRepository {
    /// Create a new repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the episodes table and indexes if they don't exist
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS episodes (
                uuid TEXT PRIMARY KEY,
                podcast_uuid TEXT NOT NULL,
                podcast_title TEXT NOT NULL DEFAULT '',
                title TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL DEFAULT '',
                published_at INTEGER,
                duration INTEGER NOT NULL DEFAULT 0,
                file_type TEXT NOT NULL DEFAULT '',
                file_size INTEGER NOT NULL DEFAULT 0,
                episode_type TEXT NOT NULL DEFAULT 'full',
                season INTEGER NOT NULL DEFAULT 0,
                number INTEGER NOT NULL DEFAULT 0,
                playing_status INTEGER NOT NULL DEFAULT 0,
                played_up_to INTEGER NOT NULL DEFAULT 0,
                starred INTEGER NOT NULL DEFAULT 0,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                played_at INTEGER,
                raw_payload TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_episodes_podcast_uuid
            ON episodes(podcast_uuid)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn map_row(row: &sqlx::sqlite::SqliteRow) -> Episode {
        Episode {
            uuid: row.get("uuid"),
            podcast_uuid: row.get("podcast_uuid"),
            podcast_title: row.get("podcast_title"),
            title: row.get("title"),
            url: row.get("url"),
            published_at: row.get("published_at"),
            duration: row.get("duration"),
            file_type: row.get("file_type"),
            file_size: row.get("file_size"),
            episode_type: row.get("episode_type"),
            season: row.get("season"),
            number: row.get("number"),
            playing_status: row.get("playing_status"),
            played_up_to: row.get("played_up_to"),
            starred: row.get("starred"),
            is_deleted: row.get("is_deleted"),
            played_at: row
                .get::<Option<i64>, _>("played_at")
                .and_then(datetime_from_millis),
            raw_payload: row.get("raw_payload"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl EpisodeRepository for SqliteEpisodeRepository {
    async fn existing_uuids(&self, uuids: &[String]) -> Result<HashSet<String>> {
        if uuids.is_empty() {
            return Ok(HashSet::new());
        }

        let sql = format!(
            "SELECT uuid FROM episodes WHERE uuid IN ({})",
            sql_placeholders(uuids.len())
        );

        let mut query = sqlx::query_scalar::<_, String>(&sql);
        for uuid in uuids {
            query = query.bind(uuid);
        }

        let found = query.fetch_all(&self.pool).await?;
        Ok(found.into_iter().collect())
    }

    async fn insert_batch(&self, episodes: &[NewEpisode]) -> Result<()> {
        if episodes.is_empty() {
            return Ok(());
        }

        let now = Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for episode in episodes {
            sqlx::query(
                r#"
                INSERT INTO episodes (
                    uuid, podcast_uuid, podcast_title, title, url, published_at,
                    duration, file_type, file_size, episode_type, season, number,
                    playing_status, played_up_to, starred, is_deleted,
                    raw_payload, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(uuid) DO NOTHING
                "#,
            )
            .bind(&episode.uuid)
            .bind(&episode.podcast_uuid)
            .bind(&episode.podcast_title)
            .bind(&episode.title)
            .bind(&episode.url)
            .bind(episode.published_at)
            .bind(episode.duration)
            .bind(&episode.file_type)
            .bind(episode.file_size)
            .bind(&episode.episode_type)
            .bind(episode.season)
            .bind(episode.number)
            .bind(episode.playing_status)
            .bind(episode.played_up_to)
            .bind(episode.starred)
            .bind(episode.is_deleted)
            .bind(&episode.raw_payload)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(count = episodes.len(), "Inserted episode batch");
        Ok(())
    }

    async fn update_sync_fields_batch(&self, updates: &[EpisodeSyncUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let now = Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for update in updates {
            sqlx::query(
                r#"
                UPDATE episodes SET
                    playing_status = ?,
                    played_up_to = ?,
                    starred = ?,
                    is_deleted = ?,
                    updated_at = ?
                WHERE uuid = ?
                "#,
            )
            .bind(update.playing_status)
            .bind(update.played_up_to)
            .bind(update.starred)
            .bind(update.is_deleted)
            .bind(now)
            .bind(&update.uuid)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(count = updates.len(), "Updated episode sync fields");
        Ok(())
    }

    async fn update_played_at_if_newer(
        &self,
        uuid: &str,
        played_at: DateTime<Utc>,
    ) -> Result<bool> {
        let millis = played_at.timestamp_millis();
        let now = Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE episodes SET
                played_at = ?,
                updated_at = ?
            WHERE uuid = ? AND (played_at IS NULL OR played_at < ?)
            "#,
        )
        .bind(millis)
        .bind(now)
        .bind(uuid)
        .bind(millis)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_uuid(&self, uuid: &str) -> Result<Option<Episode>> {
        let row = sqlx::query("SELECT * FROM episodes WHERE uuid = ?")
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(Self::map_row))
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM episodes")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use chrono::TimeZone;

    fn new_episode(uuid: &str) -> NewEpisode {
        NewEpisode {
            uuid: uuid.to_string(),
            podcast_uuid: "pod-1".to_string(),
            podcast_title: "Test Show".to_string(),
            title: format!("Episode {}", uuid),
            url: format!("https://example.com/{}.mp3", uuid),
            published_at: Some(1_700_000_000),
            duration: 1800,
            file_type: "audio/mp3".to_string(),
            file_size: 0,
            episode_type: "full".to_string(),
            season: 0,
            number: 0,
            playing_status: 3,
            played_up_to: 1800,
            starred: false,
            is_deleted: false,
            raw_payload: None,
        }
    }

    #[tokio::test]
    async fn test_existing_uuids_short_circuits_on_empty_input() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteEpisodeRepository::new(pool);

        let found = repo.existing_uuids(&[]).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_insert_and_membership() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteEpisodeRepository::new(pool);

        repo.insert_batch(&[new_episode("ep-1"), new_episode("ep-2")])
            .await
            .unwrap();

        let found = repo
            .existing_uuids(&[
                "ep-1".to_string(),
                "ep-2".to_string(),
                "ep-3".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(found.len(), 2);
        assert!(found.contains("ep-1"));
        assert!(found.contains("ep-2"));
        assert!(!found.contains("ep-3"));
    }

    #[tokio::test]
    async fn test_insert_batch_is_idempotent() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteEpisodeRepository::new(pool);

        repo.insert_batch(&[new_episode("ep-1")]).await.unwrap();
        repo.insert_batch(&[new_episode("ep-1")]).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_sync_fields_leaves_metadata_alone() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteEpisodeRepository::new(pool);

        repo.insert_batch(&[new_episode("ep-1")]).await.unwrap();

        repo.update_sync_fields_batch(&[EpisodeSyncUpdate {
            uuid: "ep-1".to_string(),
            playing_status: 2,
            played_up_to: 900,
            starred: true,
            is_deleted: true,
        }])
        .await
        .unwrap();

        let episode = repo.find_by_uuid("ep-1").await.unwrap().unwrap();
        assert_eq!(episode.playing_status, 2);
        assert_eq!(episode.played_up_to, 900);
        assert!(episode.starred);
        assert!(episode.is_deleted);
        // Metadata untouched by the sync path
        assert_eq!(episode.title, "Episode ep-1");
        assert_eq!(episode.duration, 1800);
    }

    #[tokio::test]
    async fn test_played_at_only_moves_forward() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteEpisodeRepository::new(pool);

        repo.insert_batch(&[new_episode("ep-1")]).await.unwrap();

        let earlier = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 9, 15, 0, 0, 0).unwrap();

        assert!(repo.update_played_at_if_newer("ep-1", earlier).await.unwrap());
        assert!(repo.update_played_at_if_newer("ep-1", later).await.unwrap());
        // Replaying the earlier timestamp must not regress the stored value
        assert!(!repo.update_played_at_if_newer("ep-1", earlier).await.unwrap());
        // Re-applying the same timestamp is not an update either
        assert!(!repo.update_played_at_if_newer("ep-1", later).await.unwrap());

        let episode = repo.find_by_uuid("ep-1").await.unwrap().unwrap();
        assert_eq!(episode.played_at, Some(later));
    }

    #[tokio::test]
    async fn test_played_at_update_skips_unknown_episode() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteEpisodeRepository::new(pool);

        let updated = repo
            .update_played_at_if_newer("missing", Utc::now())
            .await
            .unwrap();

        assert!(!updated);
    }
}
