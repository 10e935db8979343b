//! Pocket Casts API response types
//!
//! Data structures for deserializing Pocket Casts API responses. Fields the
//! API is known to omit carry `#[serde(default)]` so absence decodes to an
//! explicit empty value instead of failing or needing dynamic access.

use serde::Deserialize;

/// `POST /user/history/year` response
///
/// A count probe (`count=true`) returns only `count`; a full fetch returns
/// the `history.changes` list. Either part may be absent.
#[derive(Debug, Deserialize)]
pub struct HistoryYearResponse {
    #[serde(default)]
    pub count: Option<i64>,

    #[serde(default)]
    pub history: Option<HistoryChangeList>,
}

/// Wrapper object around a year's change list
#[derive(Debug, Default, Deserialize)]
pub struct HistoryChangeList {
    /// Absent means zero changes, not an error
    #[serde(default)]
    pub changes: Option<Vec<HistoryChangeJson>>,
}

/// One listen-history change record
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryChangeJson {
    /// Action code; `1` is a play event
    pub action: i64,

    /// Episode uuid the action applies to
    pub episode: String,

    /// Epoch milliseconds, transmitted as a string
    pub modified_at: String,
}

/// `POST /user/podcast/episodes` response
#[derive(Debug, Deserialize)]
pub struct EpisodeSyncResponse {
    #[serde(default)]
    pub episodes: Vec<EpisodeSyncJson>,
}

/// Per-episode sync state as transmitted
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeSyncJson {
    pub uuid: String,

    #[serde(default)]
    pub playing_status: i64,

    #[serde(default)]
    pub played_up_to: i64,

    #[serde(default)]
    pub is_deleted: bool,

    #[serde(default)]
    pub starred: bool,

    #[serde(default)]
    pub duration: Option<i64>,
}

/// `GET /podcast/full/{uuid}` episode cache response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeCacheResponse {
    #[serde(default)]
    pub episode_count: i64,

    #[serde(default)]
    pub episodes: Vec<CachedEpisodeJson>,
}

/// One cached episode's metadata as transmitted
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedEpisodeJson {
    pub uuid: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    /// Publication date, RFC 3339
    #[serde(default)]
    pub published: Option<String>,

    #[serde(default)]
    pub duration: Option<i64>,

    #[serde(default)]
    pub file_type: Option<String>,

    #[serde(default)]
    pub file_size: Option<i64>,

    #[serde(default, rename = "type")]
    pub episode_type: Option<String>,

    #[serde(default)]
    pub season: Option<i64>,

    #[serde(default)]
    pub number: Option<i64>,
}

/// `POST /user/podcast/list` response
#[derive(Debug, Deserialize)]
pub struct PodcastListResponse {
    #[serde(default)]
    pub podcasts: Vec<PodcastJson>,
}

/// One subscribed podcast as transmitted
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastJson {
    pub uuid: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub slug: String,

    #[serde(default)]
    pub sort_position: i64,
}

/// `POST /user/bookmark/list` response
#[derive(Debug, Deserialize)]
pub struct BookmarkListResponse {
    #[serde(default)]
    pub bookmarks: Vec<BookmarkJson>,
}

/// One bookmark as transmitted
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkJson {
    pub bookmark_uuid: String,

    #[serde(default)]
    pub podcast_uuid: String,

    #[serde(default)]
    pub episode_uuid: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub time: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_history_year_count_probe() {
        let json = r#"{ "count": 42 }"#;

        let response: HistoryYearResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.count, Some(42));
        assert!(response.history.is_none());
    }

    #[test]
    fn test_deserialize_history_year_full() {
        let json = r#"{
            "history": {
                "changes": [
                    { "action": 1, "episode": "ep-1", "modifiedAt": "1700000000000" },
                    { "action": 2, "episode": "ep-2", "modifiedAt": "1700000001000" }
                ]
            }
        }"#;

        let response: HistoryYearResponse = serde_json::from_str(json).unwrap();
        let changes = response.history.unwrap().changes.unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].action, 1);
        assert_eq!(changes[0].episode, "ep-1");
        assert_eq!(changes[0].modified_at, "1700000000000");
    }

    #[test]
    fn test_missing_changes_decodes_as_none() {
        let json = r#"{ "history": {} }"#;

        let response: HistoryYearResponse = serde_json::from_str(json).unwrap();
        assert!(response.history.unwrap().changes.is_none());
    }

    #[test]
    fn test_deserialize_episode_sync_defaults() {
        let json = r#"{ "episodes": [ { "uuid": "ep-1", "playingStatus": 3 } ] }"#;

        let response: EpisodeSyncResponse = serde_json::from_str(json).unwrap();
        let episode = &response.episodes[0];
        assert_eq!(episode.playing_status, 3);
        assert_eq!(episode.played_up_to, 0);
        assert!(!episode.is_deleted);
        assert!(!episode.starred);
        assert!(episode.duration.is_none());
    }

    #[test]
    fn test_deserialize_cache_episode_type_field() {
        let json = r#"{
            "episodeCount": 1,
            "episodes": [
                {
                    "uuid": "ep-1",
                    "title": "Pilot",
                    "url": "https://example.com/1.mp3",
                    "published": "2024-01-15T00:00:00Z",
                    "duration": 1800,
                    "type": "trailer"
                }
            ]
        }"#;

        let response: EpisodeCacheResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.episode_count, 1);
        assert_eq!(response.episodes[0].episode_type.as_deref(), Some("trailer"));
    }

    #[test]
    fn test_deserialize_podcast_list() {
        let json = r#"{
            "podcasts": [
                {
                    "uuid": "pod-1",
                    "title": "Test Show",
                    "author": "Host",
                    "sortPosition": 3
                }
            ]
        }"#;

        let response: PodcastListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.podcasts.len(), 1);
        assert_eq!(response.podcasts[0].sort_position, 3);
        assert!(response.podcasts[0].slug.is_empty());
    }

    #[test]
    fn test_deserialize_bookmark_list() {
        let json = r#"{
            "bookmarks": [
                {
                    "bookmarkUuid": "bm-1",
                    "podcastUuid": "pod-1",
                    "episodeUuid": "ep-1",
                    "title": "Great bit",
                    "time": 125
                }
            ]
        }"#;

        let response: BookmarkListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.bookmarks[0].bookmark_uuid, "bm-1");
        assert_eq!(response.bookmarks[0].time, 125);
    }
}
