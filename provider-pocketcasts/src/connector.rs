//! Pocket Casts API connector implementation
//!
//! Implements the `PodcastService` trait for the Pocket Casts API: the
//! authenticated user API for history, sync state, subscriptions and
//! bookmarks, plus the unauthenticated podcast cache for episode metadata.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::remote::{
    CachedEpisode, EpisodeCache, EpisodeSyncRecord, HistoryChange, HistoryPage, PodcastService,
    RemoteBookmark, RemotePodcast,
};
use bytes::Bytes;
use chrono::DateTime;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::error::PocketCastsError;
use crate::types::{
    BookmarkJson, BookmarkListResponse, CachedEpisodeJson, EpisodeCacheResponse, EpisodeSyncJson,
    EpisodeSyncResponse, HistoryChangeJson, HistoryYearResponse, PodcastJson, PodcastListResponse,
};

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Pocket Casts API connector
///
/// Implements `PodcastService` over an [`HttpClient`]. All conversion from
/// wire shapes to engine records happens here: epoch-millisecond strings
/// become integers (malformed values are parse errors), RFC 3339 publish
/// dates become epoch seconds, and absent lists become empty lists.
///
/// # Example
///
/// ```ignore
/// use provider_pocketcasts::{PocketCastsConnector, ReqwestHttpClient};
/// use std::sync::Arc;
///
/// let connector = PocketCastsConnector::new(
///     Arc::new(ReqwestHttpClient::new()),
///     "https://api.pocketcasts.com",
///     "https://podcast-api.pocketcasts.com",
/// );
/// let podcasts = connector.fetch_podcasts(&token).await?;
/// ```
pub struct PocketCastsConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Base URL of the authenticated user API
    api_base_url: String,

    /// Base URL of the unauthenticated episode cache
    cache_base_url: String,
}

impl PocketCastsConnector {
    /// Create a new connector
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        api_base_url: impl Into<String>,
        cache_base_url: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            api_base_url: api_base_url.into(),
            cache_base_url: cache_base_url.into(),
        }
    }

    /// Execute an authenticated POST with a JSON body, returning the body
    /// of a successful response
    async fn post_json(
        &self,
        path: &str,
        token: &str,
        body: serde_json::Value,
        resource: &str,
    ) -> Result<Bytes> {
        let url = format!("{}{}", self.api_base_url, path);
        let request = HttpRequest::new(HttpMethod::Post, url)
            .bearer_token(token)
            .header("Accept", "application/json")
            .json(&body)?
            .timeout(REQUEST_TIMEOUT);

        let response = self.http_client.execute(request).await?;

        if !response.is_success() {
            debug!(status = response.status, resource, "API request failed");
            return Err(PocketCastsError::ApiError {
                status_code: response.status,
                resource: resource.to_string(),
            }
            .into());
        }

        Ok(response.body)
    }

    /// Execute an unauthenticated GET, returning the body of a successful
    /// response
    async fn get(&self, url: String, resource: &str) -> Result<Bytes> {
        let request = HttpRequest::new(HttpMethod::Get, url)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT);

        let response = self.http_client.execute(request).await?;

        if !response.is_success() {
            debug!(status = response.status, resource, "Cache request failed");
            return Err(PocketCastsError::ApiError {
                status_code: response.status,
                resource: resource.to_string(),
            }
            .into());
        }

        Ok(response.body)
    }

    /// Parse an RFC 3339 timestamp to epoch seconds; lenient, the cache is
    /// best-effort metadata
    fn parse_published(published: Option<&str>) -> Option<i64> {
        published
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.timestamp())
    }

    /// Convert a wire history change, validating the millisecond string
    fn convert_history_change(
        json: HistoryChangeJson,
    ) -> std::result::Result<HistoryChange, PocketCastsError> {
        let modified_at_ms = json.modified_at.parse::<i64>().map_err(|_| {
            PocketCastsError::ParseError(format!(
                "Invalid modifiedAt timestamp {:?} for episode {}",
                json.modified_at, json.episode
            ))
        })?;

        Ok(HistoryChange {
            action: json.action,
            episode_uuid: json.episode,
            modified_at_ms,
        })
    }

    fn convert_sync_record(json: EpisodeSyncJson) -> EpisodeSyncRecord {
        EpisodeSyncRecord {
            uuid: json.uuid,
            playing_status: json.playing_status,
            played_up_to: json.played_up_to,
            is_deleted: json.is_deleted,
            starred: json.starred,
            duration: json.duration,
        }
    }

    fn convert_cached_episode(json: CachedEpisodeJson) -> CachedEpisode {
        let published_at = Self::parse_published(json.published.as_deref());

        CachedEpisode {
            uuid: json.uuid,
            title: json.title,
            url: json.url,
            published_at,
            duration: json.duration,
            file_type: json.file_type,
            file_size: json.file_size,
            episode_type: json.episode_type,
            season: json.season,
            number: json.number,
        }
    }

    fn convert_podcast(json: PodcastJson) -> RemotePodcast {
        RemotePodcast {
            uuid: json.uuid,
            title: json.title,
            author: json.author,
            description: json.description,
            url: json.url,
            slug: json.slug,
            sort_position: json.sort_position,
        }
    }

    fn convert_bookmark(json: BookmarkJson) -> RemoteBookmark {
        RemoteBookmark {
            bookmark_uuid: json.bookmark_uuid,
            podcast_uuid: json.podcast_uuid,
            episode_uuid: json.episode_uuid,
            title: json.title,
            time: json.time,
        }
    }
}

#[async_trait]
impl PodcastService for PocketCastsConnector {
    #[instrument(skip(self, token))]
    async fn fetch_history_year(
        &self,
        token: &str,
        year: i32,
        count_only: bool,
    ) -> Result<HistoryPage> {
        let resource = format!("history/{}", year);
        let body = self
            .post_json(
                "/user/history/year",
                token,
                json!({ "year": year, "count": count_only }),
                &resource,
            )
            .await?;

        let parsed: HistoryYearResponse = serde_json::from_slice(&body).map_err(|e| {
            PocketCastsError::ParseError(format!("Failed to parse history year response: {}", e))
        })?;

        // Absent history.changes means zero changes for the year
        let raw_changes = parsed
            .history
            .and_then(|h| h.changes)
            .unwrap_or_default();

        let changes = raw_changes
            .into_iter()
            .map(Self::convert_history_change)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(
            year,
            count = ?parsed.count,
            changes = changes.len(),
            "Fetched history year"
        );

        Ok(HistoryPage {
            count: parsed.count,
            changes,
        })
    }

    #[instrument(skip(self, token), fields(podcast_uuid = %podcast_uuid))]
    async fn fetch_episode_sync(
        &self,
        token: &str,
        podcast_uuid: &str,
    ) -> Result<Vec<EpisodeSyncRecord>> {
        let resource = format!("podcast/{}", podcast_uuid);
        let body = self
            .post_json(
                "/user/podcast/episodes",
                token,
                json!({ "uuid": podcast_uuid }),
                &resource,
            )
            .await?;

        let parsed: EpisodeSyncResponse = serde_json::from_slice(&body).map_err(|e| {
            PocketCastsError::ParseError(format!("Failed to parse episode sync response: {}", e))
        })?;

        debug!(
            podcast_uuid,
            episodes = parsed.episodes.len(),
            "Fetched episode sync records"
        );

        Ok(parsed
            .episodes
            .into_iter()
            .map(Self::convert_sync_record)
            .collect())
    }

    #[instrument(skip(self), fields(podcast_uuid = %podcast_uuid))]
    async fn fetch_episode_cache(&self, podcast_uuid: &str) -> Result<EpisodeCache> {
        let resource = format!("podcast-cache/{}", podcast_uuid);
        let url = format!(
            "{}/podcast/full/{}",
            self.cache_base_url,
            urlencoding::encode(podcast_uuid)
        );

        let body = self.get(url, &resource).await?;

        let parsed: EpisodeCacheResponse = serde_json::from_slice(&body).map_err(|e| {
            PocketCastsError::ParseError(format!("Failed to parse episode cache response: {}", e))
        })?;

        debug!(
            podcast_uuid,
            episode_count = parsed.episode_count,
            episodes = parsed.episodes.len(),
            "Fetched episode cache"
        );

        Ok(EpisodeCache {
            episode_count: parsed.episode_count,
            episodes: parsed
                .episodes
                .into_iter()
                .map(Self::convert_cached_episode)
                .collect(),
        })
    }

    #[instrument(skip(self, token))]
    async fn fetch_podcasts(&self, token: &str) -> Result<Vec<RemotePodcast>> {
        let body = self
            .post_json("/user/podcast/list", token, json!({ "v": 1 }), "podcast/list")
            .await?;

        let parsed: PodcastListResponse = serde_json::from_slice(&body).map_err(|e| {
            PocketCastsError::ParseError(format!("Failed to parse podcast list response: {}", e))
        })?;

        info!(podcasts = parsed.podcasts.len(), "Fetched subscription list");

        Ok(parsed
            .podcasts
            .into_iter()
            .map(Self::convert_podcast)
            .collect())
    }

    #[instrument(skip(self, token))]
    async fn fetch_bookmarks(&self, token: &str) -> Result<Vec<RemoteBookmark>> {
        let body = self
            .post_json("/user/bookmark/list", token, json!({}), "bookmark/list")
            .await?;

        let parsed: BookmarkListResponse = serde_json::from_slice(&body).map_err(|e| {
            PocketCastsError::ParseError(format!("Failed to parse bookmark list response: {}", e))
        })?;

        info!(bookmarks = parsed.bookmarks.len(), "Fetched bookmark list");

        Ok(parsed
            .bookmarks
            .into_iter()
            .map(Self::convert_bookmark)
            .collect())
    }
}
