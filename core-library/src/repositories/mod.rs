//! Repository traits and SQLite implementations
//!
//! One repository per table. Every SQLite implementation owns its schema:
//! `initialize()` creates the table and indexes with `IF NOT EXISTS`, so a
//! fresh database becomes usable without external migration tooling.

pub mod bookmark;
pub mod episode;
pub mod podcast;
pub mod progress;

pub use bookmark::{BookmarkRepository, SqliteBookmarkRepository};
pub use episode::{EpisodeRepository, SqliteEpisodeRepository};
pub use podcast::{PodcastRepository, SqlitePodcastRepository};
pub use progress::{SqliteSyncProgressRepository, SyncProgressRepository};

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Store seam for reconciling a remote "current set" against stored rows.
///
/// Podcast subscriptions and bookmarks share one lifecycle: every entity in
/// the latest remote set is upserted (all fields refreshed, `deleted_at`
/// cleared) and every stored row absent from that set is soft-deleted. The
/// reconciler in `core-sync` is generic over this trait so both tables go
/// through the identical mechanism.
#[async_trait]
pub trait CurrentSetRepository: Send + Sync {
    /// Stored entity type handled by this repository
    type Entity: Send + Sync;

    /// The stable unique id of an entity
    fn entity_uuid<'a>(&self, entity: &'a Self::Entity) -> &'a str;

    /// Insert-or-replace every entity, refreshing all fields and clearing
    /// `deleted_at`. An empty batch is a no-op, not an error.
    async fn upsert_batch(&self, entities: &[Self::Entity]) -> Result<()>;

    /// Mark rows absent from `present` as soft-deleted at `deleted_at`.
    ///
    /// Only rows whose `deleted_at` is currently null are touched, so
    /// re-applying the same set never moves an existing deletion timestamp.
    /// An empty `present` slice marks every live row deleted. Returns the
    /// number of rows newly marked.
    async fn soft_delete_absent(
        &self,
        present: &[String],
        deleted_at: DateTime<Utc>,
    ) -> Result<u64>;

    /// Total stored rows, soft-deleted included
    async fn count_all(&self) -> Result<i64>;
}

/// Build `?, ?, ...` placeholder lists for dynamic `IN (...)` clauses
pub(crate) fn sql_placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
