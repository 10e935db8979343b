//! # Play History Merger
//!
//! Builds the deduplicated "true" play history from the remote service's
//! year-bucketed history API.
//!
//! ## Overview
//!
//! History is append-only and chronological on the remote side, so the
//! merger walks years newest-first and asks for a lightweight count before
//! paying for a full fetch. The first year that reports zero entries ends
//! the scan: every older year must be empty too. Within the scanned years,
//! the first sighting of an episode wins, which pins each episode to its
//! most recent play across years.
//!
//! ## Ordering caveat
//!
//! Within a single year's change list the remote-returned order decides the
//! winner, not the greatest `modifiedAt`. An episode played twice in one
//! year keeps whichever record the remote lists first. Downstream the
//! monotonic updater refuses to move timestamps backwards, so a stale
//! winner can never regress stored state.

use bridge_traits::remote::PodcastService;
use chrono::{DateTime, Datelike, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::{Result, SyncError};

/// Oldest year the remote service can hold history for
pub const HISTORY_FLOOR_YEAR: i32 = 2010;

/// Remote action code denoting a play event
pub const PLAY_ACTION: i64 = 1;

/// One deduplicated play: an episode and its most recent known play instant.
///
/// Transient by design; the list feeds the monotonic timestamp updater and
/// is never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedEpisode {
    pub episode_uuid: String,
    pub played_at: DateTime<Utc>,
}

/// Year-bucketed history merger
pub struct HistoryMerger {
    service: Arc<dyn PodcastService>,
    start_year: i32,
}

impl HistoryMerger {
    /// Create a merger scanning from the current calendar year downwards
    pub fn new(service: Arc<dyn PodcastService>) -> Self {
        Self {
            service,
            start_year: Utc::now().year(),
        }
    }

    /// Override the first year to scan (tests, replays)
    pub fn with_start_year(mut self, year: i32) -> Self {
        self.start_year = year;
        self
    }

    /// Produce the deduplicated play history across all years with data.
    ///
    /// Any remote failure aborts the whole merge; no partial result is
    /// returned.
    #[instrument(skip(self, token), fields(start_year = self.start_year))]
    pub async fn merge(&self, token: &str) -> Result<Vec<PlayedEpisode>> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut merged: Vec<PlayedEpisode> = Vec::new();
        let mut years_scanned = 0u32;

        for year in (HISTORY_FLOOR_YEAR..=self.start_year).rev() {
            // One cheap probe saves the full fetch for empty years and
            // ends the scan at the first year with nothing in it.
            let probe = self.service.fetch_history_year(token, year, true).await?;
            let count = probe.count.unwrap_or(0);

            if count == 0 {
                debug!(year, "Empty history year; all older years are empty too");
                break;
            }

            let page = self.service.fetch_history_year(token, year, false).await?;
            years_scanned += 1;

            let mut kept = 0usize;
            for change in page.changes {
                if change.action != PLAY_ACTION {
                    continue;
                }
                if seen.contains(&change.episode_uuid) {
                    // First sighting wins; a newer year (or an earlier
                    // record in this year's list) already claimed it.
                    continue;
                }

                let played_at = DateTime::from_timestamp_millis(change.modified_at_ms)
                    .ok_or_else(|| SyncError::InvalidPlayedAt {
                        episode_uuid: change.episode_uuid.clone(),
                        millis: change.modified_at_ms,
                    })?;

                seen.insert(change.episode_uuid.clone());
                merged.push(PlayedEpisode {
                    episode_uuid: change.episode_uuid,
                    played_at,
                });
                kept += 1;
            }

            debug!(year, reported = count, kept, "Merged history year");
        }

        info!(
            entries = merged.len(),
            years_scanned, "Play history merge complete"
        );

        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::BridgeError;
    use bridge_traits::remote::{
        EpisodeCache, EpisodeSyncRecord, HistoryChange, HistoryPage, RemoteBookmark, RemotePodcast,
    };
    use mockall::mock;

    mock! {
        Service {}

        #[async_trait]
        impl PodcastService for Service {
            async fn fetch_history_year(
                &self,
                token: &str,
                year: i32,
                count_only: bool,
            ) -> bridge_traits::error::Result<HistoryPage>;
            async fn fetch_episode_sync(
                &self,
                token: &str,
                podcast_uuid: &str,
            ) -> bridge_traits::error::Result<Vec<EpisodeSyncRecord>>;
            async fn fetch_episode_cache(
                &self,
                podcast_uuid: &str,
            ) -> bridge_traits::error::Result<EpisodeCache>;
            async fn fetch_podcasts(
                &self,
                token: &str,
            ) -> bridge_traits::error::Result<Vec<RemotePodcast>>;
            async fn fetch_bookmarks(
                &self,
                token: &str,
            ) -> bridge_traits::error::Result<Vec<RemoteBookmark>>;
        }
    }

    fn play(episode: &str, millis: i64) -> HistoryChange {
        HistoryChange {
            action: PLAY_ACTION,
            episode_uuid: episode.to_string(),
            modified_at_ms: millis,
        }
    }

    fn skip(episode: &str, millis: i64) -> HistoryChange {
        HistoryChange {
            action: 2,
            episode_uuid: episode.to_string(),
            modified_at_ms: millis,
        }
    }

    #[tokio::test]
    async fn test_stops_at_first_empty_year() {
        let mut service = MockService::new();

        service
            .expect_fetch_history_year()
            .returning(|_, year, count_only| match (year, count_only) {
                (2024, true) => Ok(HistoryPage {
                    count: Some(1),
                    changes: vec![],
                }),
                (2024, false) => Ok(HistoryPage {
                    count: None,
                    changes: vec![play("ep-1", 1_700_000_000_000)],
                }),
                (2023, true) => Ok(HistoryPage {
                    count: Some(0),
                    changes: vec![],
                }),
                other => panic!("Scanned past the empty year: {:?}", other),
            });

        let merger = HistoryMerger::new(Arc::new(service)).with_start_year(2024);
        let merged = merger.merge("token").await.unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].episode_uuid, "ep-1");
    }

    #[tokio::test]
    async fn test_newest_year_wins_across_years() {
        // ep-1 played in both 2024 and 2023; 2022 is empty.
        let mut service = MockService::new();

        service
            .expect_fetch_history_year()
            .returning(|_, year, count_only| match (year, count_only) {
                (2024, true) | (2023, true) => Ok(HistoryPage {
                    count: Some(1),
                    changes: vec![],
                }),
                (2024, false) => Ok(HistoryPage {
                    count: None,
                    changes: vec![play("ep-1", 1_700_000_000_000)],
                }),
                (2023, false) => Ok(HistoryPage {
                    count: None,
                    changes: vec![play("ep-1", 1_600_000_000_000)],
                }),
                (2022, true) => Ok(HistoryPage {
                    count: Some(0),
                    changes: vec![],
                }),
                other => panic!("Unexpected fetch: {:?}", other),
            });

        let merger = HistoryMerger::new(Arc::new(service)).with_start_year(2024);
        let merged = merger.merge("token").await.unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged[0].played_at,
            DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
        );
    }

    #[tokio::test]
    async fn test_first_record_wins_within_a_year() {
        let mut service = MockService::new();

        service
            .expect_fetch_history_year()
            .returning(|_, year, count_only| match (year, count_only) {
                (2024, true) => Ok(HistoryPage {
                    count: Some(2),
                    changes: vec![],
                }),
                (2024, false) => Ok(HistoryPage {
                    count: None,
                    // Remote order decides, even though the second record
                    // has the newer timestamp.
                    changes: vec![
                        play("ep-1", 1_600_000_000_000),
                        play("ep-1", 1_700_000_000_000),
                    ],
                }),
                (2023, true) => Ok(HistoryPage {
                    count: Some(0),
                    changes: vec![],
                }),
                other => panic!("Unexpected fetch: {:?}", other),
            });

        let merger = HistoryMerger::new(Arc::new(service)).with_start_year(2024);
        let merged = merger.merge("token").await.unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged[0].played_at,
            DateTime::from_timestamp_millis(1_600_000_000_000).unwrap()
        );
    }

    #[tokio::test]
    async fn test_non_play_actions_are_discarded() {
        let mut service = MockService::new();

        service
            .expect_fetch_history_year()
            .returning(|_, year, count_only| match (year, count_only) {
                (2024, true) => Ok(HistoryPage {
                    count: Some(2),
                    changes: vec![],
                }),
                (2024, false) => Ok(HistoryPage {
                    count: None,
                    changes: vec![
                        skip("ep-1", 1_700_000_000_000),
                        play("ep-2", 1_700_000_001_000),
                    ],
                }),
                (2023, true) => Ok(HistoryPage {
                    count: Some(0),
                    changes: vec![],
                }),
                other => panic!("Unexpected fetch: {:?}", other),
            });

        let merger = HistoryMerger::new(Arc::new(service)).with_start_year(2024);
        let merged = merger.merge("token").await.unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].episode_uuid, "ep-2");
    }

    #[tokio::test]
    async fn test_remote_failure_aborts_with_no_partial_result() {
        let mut service = MockService::new();

        service
            .expect_fetch_history_year()
            .returning(|_, year, count_only| match (year, count_only) {
                (2024, true) => Ok(HistoryPage {
                    count: Some(1),
                    changes: vec![],
                }),
                (2024, false) => Ok(HistoryPage {
                    count: None,
                    changes: vec![play("ep-1", 1_700_000_000_000)],
                }),
                (2023, true) => Err(BridgeError::Api {
                    status: 500,
                    resource: "history/2023".to_string(),
                }),
                other => panic!("Unexpected fetch: {:?}", other),
            });

        let merger = HistoryMerger::new(Arc::new(service)).with_start_year(2024);
        let result = merger.merge("token").await;

        assert!(matches!(result, Err(SyncError::Remote(_))));
    }
}
