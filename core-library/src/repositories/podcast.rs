//! Podcast repository trait and SQLite implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::Result;
use crate::models::{datetime_from_millis, Podcast};
use crate::repositories::{sql_placeholders, CurrentSetRepository};

/// Podcast data access operations beyond the reconciliation seam
#[async_trait]
pub trait PodcastRepository: CurrentSetRepository<Entity = Podcast> {
    /// Find a podcast by its uuid
    async fn find_by_uuid(&self, uuid: &str) -> Result<Option<Podcast>>;
}

/// SQLite implementation of [`PodcastRepository`]
pub struct SqlitePodcastRepository {
    pool: SqlitePool,
}

impl SqlitePodcastRepository {
    /// Create a new repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the podcasts table if it doesn't exist
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS podcasts (
                uuid TEXT PRIMARY KEY,
                title TEXT NOT NULL DEFAULT '',
                author TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL DEFAULT '',
                slug TEXT NOT NULL DEFAULT '',
                sort_position INTEGER NOT NULL DEFAULT 0,
                deleted_at INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn map_row(row: &sqlx::sqlite::SqliteRow) -> Podcast {
        Podcast {
            uuid: row.get("uuid"),
            title: row.get("title"),
            author: row.get("author"),
            description: row.get("description"),
            url: row.get("url"),
            slug: row.get("slug"),
            sort_position: row.get("sort_position"),
            deleted_at: row
                .get::<Option<i64>, _>("deleted_at")
                .and_then(datetime_from_millis),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl CurrentSetRepository for SqlitePodcastRepository {
    type Entity = Podcast;

    fn entity_uuid<'a>(&self, entity: &'a Podcast) -> &'a str {
        &entity.uuid
    }

    async fn upsert_batch(&self, entities: &[Podcast]) -> Result<()> {
        if entities.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for podcast in entities {
            sqlx::query(
                r#"
                INSERT INTO podcasts (
                    uuid, title, author, description, url, slug, sort_position,
                    deleted_at, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, NULL, ?, ?)
                ON CONFLICT(uuid) DO UPDATE SET
                    title = excluded.title,
                    author = excluded.author,
                    description = excluded.description,
                    url = excluded.url,
                    slug = excluded.slug,
                    sort_position = excluded.sort_position,
                    deleted_at = NULL,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&podcast.uuid)
            .bind(&podcast.title)
            .bind(&podcast.author)
            .bind(&podcast.description)
            .bind(&podcast.url)
            .bind(&podcast.slug)
            .bind(podcast.sort_position)
            .bind(podcast.created_at)
            .bind(podcast.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(count = entities.len(), "Upserted podcast batch");
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
            sqlx::query("UPDATE podcasts SET deleted_at = ?, updated_at = ? WHERE deleted_at IS NULL")
                .bind(millis)
                .bind(now)
                .execute(&self.pool)
                .await?
        } else {
            let sql = format!(
                r#"
                UPDATE podcasts SET deleted_at = ?, updated_at = ?
                WHERE deleted_at IS NULL AND uuid NOT IN ({})
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
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM podcasts")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl PodcastRepository for SqlitePodcastRepository {
    async fn find_by_uuid(&self, uuid: &str) -> Result<Option<Podcast>> {
        let row = sqlx::query("SELECT * FROM podcasts WHERE uuid = ?")
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(Self::map_row))
    }
}
