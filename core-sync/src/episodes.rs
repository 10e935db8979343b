//! # Episode Delta Classifier
//!
//! Turns one podcast's remote sync records into the minimum set of store
//! writes: updates for episodes we already hold, inserts for first
//! sightings that the episode cache can fully describe.
//!
//! ## Overview
//!
//! Only records with evidence of interaction (`playing_status > 0` or
//! `played_up_to > 0`) are considered at all; untouched episodes never
//! reach the store. A single batched existence check splits the remainder
//! into updates and inserts. Inserts need metadata the sync record does not
//! carry (title, url, publish date), which comes from the separately
//! fetched episode cache; a record with no cache entry is dropped rather
//! than inserted incomplete.

use bridge_traits::remote::{CachedEpisode, EpisodeCache, EpisodeSyncRecord, RemotePodcast};
use core_library::models::{EpisodeSyncUpdate, NewEpisode};
use core_library::repositories::EpisodeRepository;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::Result;

/// Podcast-level context handed down to episode inserts.
///
/// Travels inside `PodcastEpisodes` task payloads, so a unit of work is
/// self-contained under redelivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodcastMeta {
    pub uuid: String,
    pub title: String,
    pub author: String,
    pub slug: String,
}

impl From<&RemotePodcast> for PodcastMeta {
    fn from(remote: &RemotePodcast) -> Self {
        Self {
            uuid: remote.uuid.clone(),
            title: remote.title.clone(),
            author: remote.author.clone(),
            slug: remote.slug.clone(),
        }
    }
}

/// Outcome of one classification pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyOutcome {
    /// Existing episodes whose sync fields were refreshed
    pub updated: usize,
    /// First-sighting episodes inserted with cache metadata
    pub inserted: usize,
    /// New episodes dropped for lack of cache metadata
    pub dropped: usize,
}

/// Classifier over the episode store
pub struct EpisodeClassifier {
    episodes: Arc<dyn EpisodeRepository>,
}

impl EpisodeClassifier {
    /// Create a new classifier
    pub fn new(episodes: Arc<dyn EpisodeRepository>) -> Self {
        Self { episodes }
    }

    /// Partition one podcast's sync records into updates and inserts and
    /// apply both batches, updates first.
    ///
    /// Records without interaction are ignored before any store access;
    /// an entirely uninteracted podcast costs zero queries.
    #[instrument(skip(self, records, cache), fields(podcast_uuid = %podcast.uuid))]
    pub async fn sync_podcast_episodes(
        &self,
        records: Vec<EpisodeSyncRecord>,
        cache: &EpisodeCache,
        podcast: &PodcastMeta,
    ) -> Result<ClassifyOutcome> {
        let interacted: Vec<EpisodeSyncRecord> = records
            .into_iter()
            .filter(|r| r.playing_status > 0 || r.played_up_to > 0)
            .collect();

        if interacted.is_empty() {
            debug!("No interacted episodes; skipping store entirely");
            return Ok(ClassifyOutcome::default());
        }

        let uuids: Vec<String> = interacted.iter().map(|r| r.uuid.clone()).collect();
        let existing = self.episodes.existing_uuids(&uuids).await?;

        let cache_by_uuid: HashMap<&str, &CachedEpisode> = cache
            .episodes
            .iter()
            .map(|e| (e.uuid.as_str(), e))
            .collect();

        let mut updates: Vec<EpisodeSyncUpdate> = Vec::new();
        let mut inserts: Vec<NewEpisode> = Vec::new();
        let mut dropped = 0usize;

        for record in &interacted {
            if existing.contains(&record.uuid) {
                updates.push(EpisodeSyncUpdate {
                    uuid: record.uuid.clone(),
                    playing_status: record.playing_status,
                    played_up_to: record.played_up_to,
                    starred: record.starred,
                    is_deleted: record.is_deleted,
                });
            } else if let Some(cached) = cache_by_uuid.get(record.uuid.as_str()) {
                inserts.push(Self::build_insert(record, cached, podcast));
            } else {
                // Cannot materialize a full row without cache metadata.
                dropped += 1;
                debug!(episode_uuid = %record.uuid, "No cache metadata; dropping new episode");
            }
        }

        // Updates land before inserts; both writes skip empty batches.
        self.episodes.update_sync_fields_batch(&updates).await?;
        self.episodes.insert_batch(&inserts).await?;

        let outcome = ClassifyOutcome {
            updated: updates.len(),
            inserted: inserts.len(),
            dropped,
        };

        info!(
            updated = outcome.updated,
            inserted = outcome.inserted,
            dropped = outcome.dropped,
            "Classified episode sync records"
        );

        Ok(outcome)
    }

    /// Combine a sync record with cache metadata into a full insert row
    fn build_insert(
        record: &EpisodeSyncRecord,
        cached: &CachedEpisode,
        podcast: &PodcastMeta,
    ) -> NewEpisode {
        NewEpisode {
            uuid: record.uuid.clone(),
            podcast_uuid: podcast.uuid.clone(),
            podcast_title: podcast.title.clone(),
            title: cached.title.clone().unwrap_or_default(),
            url: cached.url.clone().unwrap_or_default(),
            published_at: cached.published_at,
            duration: cached.duration.or(record.duration).unwrap_or(0),
            file_type: cached.file_type.clone().unwrap_or_default(),
            file_size: cached.file_size.unwrap_or(0),
            episode_type: cached
                .episode_type
                .clone()
                .unwrap_or_else(|| "full".to_string()),
            season: cached.season.unwrap_or(0),
            number: cached.number.unwrap_or(0),
            playing_status: record.playing_status,
            played_up_to: record.played_up_to,
            starred: record.starred,
            is_deleted: record.is_deleted,
            raw_payload: Self::audit_payload(record, podcast),
        }
    }

    /// Snapshot the remote record plus podcast context for audit
    fn audit_payload(record: &EpisodeSyncRecord, podcast: &PodcastMeta) -> Option<String> {
        #[derive(Serialize)]
        struct Audit<'a> {
            record: &'a EpisodeSyncRecord,
            podcast_uuid: &'a str,
            podcast_title: &'a str,
            podcast_author: &'a str,
            podcast_slug: &'a str,
        }

        serde_json::to_string(&Audit {
            record,
            podcast_uuid: &podcast.uuid,
            podcast_title: &podcast.title,
            podcast_author: &podcast.author,
            podcast_slug: &podcast.slug,
        })
        .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_library::db::create_test_pool;
    use core_library::repositories::SqliteEpisodeRepository;

    fn meta() -> PodcastMeta {
        PodcastMeta {
            uuid: "pod-1".to_string(),
            title: "Test Show".to_string(),
            author: "Host".to_string(),
            slug: "test-show".to_string(),
        }
    }

    fn record(uuid: &str, status: i64, played_up_to: i64) -> EpisodeSyncRecord {
        EpisodeSyncRecord {
            uuid: uuid.to_string(),
            playing_status: status,
            played_up_to,
            is_deleted: false,
            starred: false,
            duration: Some(900),
        }
    }

    fn cached(uuid: &str) -> CachedEpisode {
        CachedEpisode {
            uuid: uuid.to_string(),
            title: Some(format!("Episode {}", uuid)),
            url: Some(format!("https://example.com/{}.mp3", uuid)),
            published_at: Some(1_700_000_000),
            duration: Some(1800),
            file_type: Some("audio/mp3".to_string()),
            file_size: Some(123_456),
            episode_type: None,
            season: None,
            number: None,
        }
    }

    async fn setup() -> (EpisodeClassifier, Arc<dyn EpisodeRepository>) {
        let pool = create_test_pool().await.unwrap();
        let repo: Arc<dyn EpisodeRepository> = Arc::new(SqliteEpisodeRepository::new(pool));
        (EpisodeClassifier::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_uninteracted_records_never_touch_the_store() {
        let (classifier, repo) = setup().await;

        let cache = EpisodeCache {
            episode_count: 1,
            episodes: vec![cached("ep-1")],
        };

        let outcome = classifier
            .sync_podcast_episodes(vec![record("ep-1", 0, 0)], &cache, &meta())
            .await
            .unwrap();

        assert_eq!(outcome, ClassifyOutcome::default());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_new_episode_combines_cache_and_sync_fields() {
        let (classifier, repo) = setup().await;

        let cache = EpisodeCache {
            episode_count: 1,
            episodes: vec![cached("ep-1")],
        };

        let outcome = classifier
            .sync_podcast_episodes(vec![record("ep-1", 3, 1800)], &cache, &meta())
            .await
            .unwrap();

        assert_eq!(outcome.inserted, 1);

        let episode = repo.find_by_uuid("ep-1").await.unwrap().unwrap();
        assert_eq!(episode.title, "Episode ep-1");
        assert_eq!(episode.duration, 1800);
        assert_eq!(episode.episode_type, "full");
        assert_eq!(episode.season, 0);
        assert_eq!(episode.playing_status, 3);
        assert_eq!(episode.podcast_title, "Test Show");
        assert!(episode.raw_payload.is_some());
    }

    #[tokio::test]
    async fn test_duration_falls_back_to_sync_record() {
        let (classifier, repo) = setup().await;

        let mut entry = cached("ep-1");
        entry.duration = None;
        let cache = EpisodeCache {
            episode_count: 1,
            episodes: vec![entry],
        };

        classifier
            .sync_podcast_episodes(vec![record("ep-1", 2, 300)], &cache, &meta())
            .await
            .unwrap();

        let episode = repo.find_by_uuid("ep-1").await.unwrap().unwrap();
        assert_eq!(episode.duration, 900);
    }

    #[tokio::test]
    async fn test_cache_miss_drops_the_record() {
        let (classifier, repo) = setup().await;

        let cache = EpisodeCache::default();

        let outcome = classifier
            .sync_podcast_episodes(vec![record("ep-1", 3, 0)], &cache, &meta())
            .await
            .unwrap();

        assert_eq!(outcome.dropped, 1);
        assert_eq!(outcome.inserted, 0);
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_existing_episode_gets_update_not_insert() {
        let (classifier, repo) = setup().await;

        let cache = EpisodeCache {
            episode_count: 1,
            episodes: vec![cached("ep-1")],
        };

        // First pass inserts.
        classifier
            .sync_podcast_episodes(vec![record("ep-1", 2, 300)], &cache, &meta())
            .await
            .unwrap();

        // Second pass must classify as an update and keep metadata intact,
        // even with an empty cache.
        let mut second = record("ep-1", 3, 1800);
        second.starred = true;
        let outcome = classifier
            .sync_podcast_episodes(vec![second], &EpisodeCache::default(), &meta())
            .await
            .unwrap();

        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.inserted, 0);

        let episode = repo.find_by_uuid("ep-1").await.unwrap().unwrap();
        assert_eq!(episode.playing_status, 3);
        assert!(episode.starred);
        assert_eq!(episode.title, "Episode ep-1");
    }

    #[tokio::test]
    async fn test_mixed_batch_partitions_correctly() {
        let (classifier, repo) = setup().await;

        let cache = EpisodeCache {
            episode_count: 2,
            episodes: vec![cached("ep-1"), cached("ep-2")],
        };

        classifier
            .sync_podcast_episodes(vec![record("ep-1", 3, 0)], &cache, &meta())
            .await
            .unwrap();

        let outcome = classifier
            .sync_podcast_episodes(
                vec![
                    record("ep-1", 3, 1800), // existing -> update
                    record("ep-2", 2, 60),   // new, cached -> insert
                    record("ep-3", 2, 60),   // new, uncached -> dropped
                    record("ep-4", 0, 0),    // uninteracted -> ignored
                ],
                &cache,
                &meta(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.dropped, 1);
        assert_eq!(repo.count().await.unwrap(), 2);
    }
}
