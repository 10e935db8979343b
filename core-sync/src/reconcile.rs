//! # Current-Set Reconciler
//!
//! Reconciles a remote "current set" (subscriptions, bookmarks) against the
//! stored set. One mechanism, generic over the store seam, instantiated for
//! both entity kinds: upsert everything the remote reports, soft-delete
//! everything it no longer reports, restore anything that came back.
//!
//! Rows are never removed. An entity's `deleted_at` always reflects the
//! most recent pass only: present in the latest set means null, absent
//! means the instant of the pass that first noticed the absence. Replaying
//! the same set is a no-op for already-deleted rows.

use chrono::Utc;
use core_library::repositories::CurrentSetRepository;
use tracing::info;

use crate::error::Result;

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Entities in the remote set
    pub received: usize,
    /// Stored rows newly marked deleted by this pass
    pub marked_deleted: u64,
    /// Total stored rows after the pass, soft-deleted included
    pub total_stored: i64,
}

/// Reconcile the full remote set for one entity kind.
///
/// An empty remote set is valid and marks every live stored row deleted.
pub async fn reconcile_current_set<R>(
    repo: &R,
    set_name: &str,
    entities: Vec<R::Entity>,
) -> Result<ReconcileOutcome>
where
    R: CurrentSetRepository + ?Sized,
{
    let present: Vec<String> = entities
        .iter()
        .map(|entity| repo.entity_uuid(entity).to_string())
        .collect();

    repo.upsert_batch(&entities).await?;
    let marked_deleted = repo.soft_delete_absent(&present, Utc::now()).await?;
    let total_stored = repo.count_all().await?;

    let outcome = ReconcileOutcome {
        received: entities.len(),
        marked_deleted,
        total_stored,
    };

    info!(
        set = set_name,
        received = outcome.received,
        marked_deleted = outcome.marked_deleted,
        total_stored = outcome.total_stored,
        "Reconciled current set"
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_library::db::create_test_pool;
    use core_library::models::{Bookmark, Podcast};
    use core_library::repositories::{
        BookmarkRepository, PodcastRepository, SqliteBookmarkRepository, SqlitePodcastRepository,
    };

    fn podcast(uuid: &str) -> Podcast {
        Podcast {
            uuid: uuid.to_string(),
            title: format!("Show {}", uuid),
            author: "Host".to_string(),
            description: String::new(),
            url: String::new(),
            slug: String::new(),
            sort_position: 0,
            deleted_at: None,
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
        }
    }

    fn bookmark(uuid: &str) -> Bookmark {
        Bookmark {
            bookmark_uuid: uuid.to_string(),
            podcast_uuid: "pod-1".to_string(),
            episode_uuid: "ep-1".to_string(),
            title: String::new(),
            time: 10,
            deleted_at: None,
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn test_removal_and_return_round_trip() {
        // Remote set goes [A, B], then [A], then [A, B] again.
        let pool = create_test_pool().await.unwrap();
        let repo = SqlitePodcastRepository::new(pool);

        reconcile_current_set(&repo, "podcasts", vec![podcast("A"), podcast("B")])
            .await
            .unwrap();
        assert!(repo.find_by_uuid("B").await.unwrap().unwrap().deleted_at.is_none());

        let second = reconcile_current_set(&repo, "podcasts", vec![podcast("A")])
            .await
            .unwrap();
        assert_eq!(second.marked_deleted, 1);
        assert!(repo.find_by_uuid("B").await.unwrap().unwrap().deleted_at.is_some());

        let third = reconcile_current_set(&repo, "podcasts", vec![podcast("A"), podcast("B")])
            .await
            .unwrap();
        assert_eq!(third.marked_deleted, 0);
        assert!(repo.find_by_uuid("B").await.unwrap().unwrap().deleted_at.is_none());
        assert_eq!(third.total_stored, 2);
    }

    #[tokio::test]
    async fn test_reapplying_same_set_is_idempotent() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqlitePodcastRepository::new(pool);

        reconcile_current_set(&repo, "podcasts", vec![podcast("A")])
            .await
            .unwrap();
        reconcile_current_set(&repo, "podcasts", vec![])
            .await
            .unwrap();

        let stamped = repo.find_by_uuid("A").await.unwrap().unwrap().deleted_at;
        assert!(stamped.is_some());

        // A second empty pass must not move the deletion timestamp.
        let replay = reconcile_current_set(&repo, "podcasts", vec![])
            .await
            .unwrap();
        assert_eq!(replay.marked_deleted, 0);

        let unchanged = repo.find_by_uuid("A").await.unwrap().unwrap().deleted_at;
        assert_eq!(unchanged, stamped);
    }

    #[tokio::test]
    async fn test_empty_remote_set_deletes_everything() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqlitePodcastRepository::new(pool);

        reconcile_current_set(&repo, "podcasts", vec![podcast("A"), podcast("B")])
            .await
            .unwrap();

        let outcome = reconcile_current_set(&repo, "podcasts", vec![])
            .await
            .unwrap();

        assert_eq!(outcome.received, 0);
        assert_eq!(outcome.marked_deleted, 2);
        assert_eq!(outcome.total_stored, 2);
    }

    #[tokio::test]
    async fn test_same_mechanism_drives_bookmarks() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteBookmarkRepository::new(pool);

        reconcile_current_set(&repo, "bookmarks", vec![bookmark("bm-1"), bookmark("bm-2")])
            .await
            .unwrap();
        let outcome = reconcile_current_set(&repo, "bookmarks", vec![bookmark("bm-2")])
            .await
            .unwrap();

        assert_eq!(outcome.marked_deleted, 1);
        assert!(repo
            .find_by_uuid("bm-1")
            .await
            .unwrap()
            .unwrap()
            .deleted_at
            .is_some());
        assert!(repo
            .find_by_uuid("bm-2")
            .await
            .unwrap()
            .unwrap()
            .deleted_at
            .is_none());
    }
}
