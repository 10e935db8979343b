//! Bookmark repository trait and SQLite implementation
//!
//! Bookmarks go through the same reconciliation seam as podcasts; the
//! episode/podcast references are soft (not FK-enforced) because a bookmark
//! can outlive its episode in the local store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::Result;
use crate::models::{datetime_from_millis, Bookmark};
use crate::repositories::{sql_placeholders, CurrentSetRepository};

/// Bookmark data access operations beyond the reconciliation seam
#[async_trait]
pub trait BookmarkRepository: CurrentSetRepository<Entity = Bookmark> {
    /// Find a bookmark by its uuid
    async fn find_by_uuid(&self, bookmark_uuid: &str) -> Result<Option<Bookmark>>;
}

/// SQLite implementation of [`BookmarkRepository`]
pub struct SqliteBookmarkRepository {
    pool: SqlitePool,
}

impl SqliteBookmarkRepository {
    /// Create a new repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the bookmarks table if it doesn't exist
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bookmarks (
                bookmark_uuid TEXT PRIMARY KEY,
                podcast_uuid TEXT NOT NULL DEFAULT '',
                episode_uuid TEXT NOT NULL DEFAULT '',
                title TEXT NOT NULL DEFAULT '',
                time INTEGER NOT NULL DEFAULT 0,
                deleted_at INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_bookmarks_episode_uuid
            ON bookmarks(episode_uuid)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn map_row(row: &sqlx::sqlite::SqliteRow) -> Bookmark {
        Bookmark {
            bookmark_uuid: row.get("bookmark_uuid"),
            podcast_uuid: row.get("podcast_uuid"),
            episode_uuid: row.get("episode_uuid"),
            title: row.get("title"),
            time: row.get("time"),
            deleted_at: row
                .get::<Option<i64>, _>("deleted_at")
                .and_then(datetime_from_millis),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl CurrentSetRepository for SqliteBookmarkRepository {
    type Entity = Bookmark;

    fn entity_uuid<'a>(&self, entity: &'a Bookmark) -> &'a str {
        &entity.bookmark_uuid
    }

    async fn upsert_batch(&self, entities: &[Bookmark]) -> Result<()> {
        if entities.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for bookmark in entities {
            sqlx::query(
                r#"
                INSERT INTO bookmarks (
                    bookmark_uuid, podcast_uuid, episode_uuid, title, time,
                    deleted_at, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, NULL, ?, ?)
                ON CONFLICT(bookmark_uuid) DO UPDATE SET
                    podcast_uuid = excluded.podcast_uuid,
                    episode_uuid = excluded.episode_uuid,
                    title = excluded.title,
                    time = excluded.time,
                    deleted_at = NULL,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&bookmark.bookmark_uuid)
            .bind(&bookmark.podcast_uuid)
            .bind(&bookmark.episode_uuid)
            .bind(&bookmark.title)
            .bind(bookmark.time)
            .bind(bookmark.created_at)
            .bind(bookmark.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(count = entities.len(), "Upserted bookmark batch");
        Ok(())
    }

    async fn soft_delete_absent(
        &self,
        present: &[String],
        deleted_at: DateTime<Utc>,
    ) -> Result<u64> {
        let millis = deleted_at.timestamp_millis();
        let now = deleted_at.timestamp();

        let result = if present.is_empty() {
            sqlx::query(
                "UPDATE bookmarks SET deleted_at = ?, updated_at = ? WHERE deleted_at IS NULL",
            )
            .bind(millis)
            .bind(now)
            .execute(&self.pool)
            .await?
        } else {
            let sql = format!(
                r#"
                UPDATE bookmarks SET deleted_at = ?, updated_at = ?
                WHERE deleted_at IS NULL AND bookmark_uuid NOT IN ({})
                "#,
                sql_placeholders(present.len())
            );

            let mut query = sqlx::query(&sql).bind(millis).bind(now);
            for uuid in present {
                query = query.bind(uuid);
            }
            query.execute(&self.pool).await?
        };

        Ok(result.rows_affected())
    }

    async fn count_all(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookmarks")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl BookmarkRepository for SqliteBookmarkRepository {
    async fn find_by_uuid(&self, bookmark_uuid: &str) -> Result<Option<Bookmark>> {
        let row = sqlx::query("SELECT * FROM bookmarks WHERE bookmark_uuid = ?")
            .bind(bookmark_uuid)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(Self::map_row))
    }
}
