//! Remote Podcast Service Abstraction
//!
//! Provider-agnostic contract for the remote podcast service a mirror pulls
//! from: listen history, per-podcast episode sync state, the public episode
//! metadata cache, subscriptions and bookmarks.
//!
//! Connectors convert their wire formats into the plain records defined
//! here at the edge (string epoch-millisecond fields become `i64`, RFC 3339
//! dates become epoch seconds), so the engine only ever sees validated,
//! explicitly-defaulted values.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One page of the year-bucketed listen history.
///
/// A count probe (`count_only = true`) populates `count` and leaves
/// `changes` empty; a full fetch populates `changes`. A response with no
/// change list at all decodes as an empty `changes`, never an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryPage {
    /// Number of history entries in the year, when requested
    pub count: Option<i64>,
    /// Change records in remote-returned order
    pub changes: Vec<HistoryChange>,
}

/// A single listen-history change record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryChange {
    /// Remote action code; `1` is a play event, other codes are skips
    pub action: i64,
    /// Episode the action applies to
    pub episode_uuid: String,
    /// When the action was recorded, epoch milliseconds
    pub modified_at_ms: i64,
}

/// Per-episode sync state for one podcast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeSyncRecord {
    pub uuid: String,
    /// Remote playback status code; `0` means never started
    pub playing_status: i64,
    /// Playback position in seconds
    pub played_up_to: i64,
    /// Whether the user archived/deleted the episode remotely
    pub is_deleted: bool,
    pub starred: bool,
    /// Duration in seconds, when the sync record carries one
    pub duration: Option<i64>,
}

/// Episode metadata from the public podcast cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpisodeCache {
    pub episode_count: i64,
    pub episodes: Vec<CachedEpisode>,
}

/// One cached episode's metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CachedEpisode {
    pub uuid: String,
    pub title: Option<String>,
    pub url: Option<String>,
    /// Publication date, epoch seconds
    pub published_at: Option<i64>,
    /// Duration in seconds
    pub duration: Option<i64>,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    /// "full", "trailer", "bonus", ...
    pub episode_type: Option<String>,
    pub season: Option<i64>,
    pub number: Option<i64>,
}

/// A currently subscribed podcast
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemotePodcast {
    pub uuid: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub url: String,
    pub slug: String,
    /// Remote-defined ordering within the user's subscription list
    pub sort_position: i64,
}

/// A bookmark on an episode
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteBookmark {
    pub bookmark_uuid: String,
    /// Soft reference, not guaranteed to resolve locally
    pub podcast_uuid: String,
    /// Soft reference, not guaranteed to resolve locally
    pub episode_uuid: String,
    pub title: String,
    /// Offset into the episode, seconds
    pub time: i64,
}

/// Typed access to the remote podcast service
///
/// Every method surfaces non-success responses as
/// [`BridgeError::Api`](crate::error::BridgeError::Api) carrying the HTTP
/// status and the resource being fetched (`history/2024`,
/// `podcast/<uuid>`, ...). The engine treats any such failure as fatal for
/// the current operation; there is no retry at this layer.
#[async_trait]
pub trait PodcastService: Send + Sync {
    /// Fetch one year bucket of listen history.
    ///
    /// With `count_only`, issues the lightweight count probe and returns a
    /// page whose `count` is set and whose `changes` is empty.
    async fn fetch_history_year(
        &self,
        token: &str,
        year: i32,
        count_only: bool,
    ) -> Result<HistoryPage>;

    /// Fetch the user's sync state for every episode of one podcast
    async fn fetch_episode_sync(
        &self,
        token: &str,
        podcast_uuid: &str,
    ) -> Result<Vec<EpisodeSyncRecord>>;

    /// Fetch episode metadata for one podcast from the public cache.
    ///
    /// The cache is a separate, unauthenticated source; entries may lag the
    /// sync state, so callers must tolerate missing episodes.
    async fn fetch_episode_cache(&self, podcast_uuid: &str) -> Result<EpisodeCache>;

    /// Fetch the full current subscription set
    async fn fetch_podcasts(&self, token: &str) -> Result<Vec<RemotePodcast>>;

    /// Fetch the full current bookmark set
    async fn fetch_bookmarks(&self, token: &str) -> Result<Vec<RemoteBookmark>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_page_default_has_no_changes() {
        let page = HistoryPage::default();
        assert!(page.count.is_none());
        assert!(page.changes.is_empty());
    }

    #[test]
    fn test_records_round_trip_through_serde() {
        let record = EpisodeSyncRecord {
            uuid: "ep-1".to_string(),
            playing_status: 3,
            played_up_to: 120,
            is_deleted: false,
            starred: true,
            duration: Some(1800),
        };

        let json = serde_json::to_string(&record).unwrap();
        let back: EpisodeSyncRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.uuid, "ep-1");
        assert_eq!(back.playing_status, 3);
        assert_eq!(back.duration, Some(1800));
    }
}
