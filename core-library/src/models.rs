//! Domain models for the podcast mirror store
//!
//! Stored entities plus the write payloads the sync engine produces.
//! Instants that participate in SQL comparisons (`played_at`, `deleted_at`)
//! are persisted as epoch-millisecond integers; the models expose them as
//! `DateTime<Utc>` and the repositories convert at the row boundary.

use bridge_traits::remote::{RemoteBookmark, RemotePodcast};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Playback state of an episode, derived from the raw remote status code.
///
/// The raw code is what gets stored; this enum exists for classification
/// and display. Any positive code that is not a completed play reads as
/// in-progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayingStatus {
    /// Never started (code 0)
    NotStarted,
    /// Started but not finished
    InProgress,
    /// Completed (code 3)
    Played,
}

impl PlayingStatus {
    /// Map a remote status code onto a playback state
    pub fn from_code(code: i64) -> Self {
        match code {
            c if c <= 0 => Self::NotStarted,
            3 => Self::Played,
            _ => Self::InProgress,
        }
    }

    /// Whether the code records any interaction at all
    pub fn is_interacted(code: i64) -> bool {
        code > 0
    }
}

/// A stored episode row.
///
/// Created on first sighting through the insert path; mutated afterwards by
/// sync-field updates and the played-at updater. Never hard-deleted: remote
/// removal only flips `is_deleted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub uuid: String,
    pub podcast_uuid: String,
    /// Denormalized for listing without a join
    pub podcast_title: String,
    pub title: String,
    pub url: String,
    /// Publication date, epoch seconds
    pub published_at: Option<i64>,
    /// Duration in seconds
    pub duration: i64,
    pub file_type: String,
    pub file_size: i64,
    pub episode_type: String,
    pub season: i64,
    pub number: i64,
    /// Raw remote status code; see [`PlayingStatus::from_code`]
    pub playing_status: i64,
    /// Playback position in seconds
    pub played_up_to: i64,
    pub starred: bool,
    /// Remote removal flag; distinct from the reconciler's `deleted_at`
    pub is_deleted: bool,
    /// Most recent known play instant; only ever moves forward
    pub played_at: Option<DateTime<Utc>>,
    /// Opaque snapshot of the remote record for audit
    pub raw_payload: Option<String>,
    /// Unix timestamp when first stored
    pub created_at: i64,
    /// Unix timestamp of the last write
    pub updated_at: i64,
}

/// Full insert payload for an episode seen for the first time.
///
/// Built by the delta classifier from the remote sync record joined with
/// the episode cache; `played_at` starts null and is only ever set by the
/// played-at updater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEpisode {
    pub uuid: String,
    pub podcast_uuid: String,
    pub podcast_title: String,
    pub title: String,
    pub url: String,
    pub published_at: Option<i64>,
    pub duration: i64,
    pub file_type: String,
    pub file_size: i64,
    pub episode_type: String,
    pub season: i64,
    pub number: i64,
    pub playing_status: i64,
    pub played_up_to: i64,
    pub starred: bool,
    pub is_deleted: bool,
    pub raw_payload: Option<String>,
}

/// Mutable sync fields for an episode that already exists in the store.
///
/// Title, url and duration are deliberately absent: metadata is written
/// once at insert and never overwritten by sync passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSyncUpdate {
    pub uuid: String,
    pub playing_status: i64,
    pub played_up_to: i64,
    pub starred: bool,
    pub is_deleted: bool,
}

/// A stored podcast subscription row.
///
/// `deleted_at` is null while the podcast is present in the latest remote
/// set; reconciliation sets it when the podcast disappears and clears it
/// when it comes back. Rows are never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Podcast {
    pub uuid: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub url: String,
    pub slug: String,
    /// Remote-defined ordering within the subscription list
    pub sort_position: i64,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Podcast {
    /// Build a live (non-deleted) row from a remote subscription entry
    pub fn from_remote(remote: &RemotePodcast, now: i64) -> Self {
        Self {
            uuid: remote.uuid.clone(),
            title: remote.title.clone(),
            author: remote.author.clone(),
            description: remote.description.clone(),
            url: remote.url.clone(),
            slug: remote.slug.clone(),
            sort_position: remote.sort_position,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A stored bookmark row; same soft-delete lifecycle as [`Podcast`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub bookmark_uuid: String,
    /// Soft reference, not FK-enforced
    pub podcast_uuid: String,
    /// Soft reference, not FK-enforced
    pub episode_uuid: String,
    pub title: String,
    /// Offset into the episode, seconds
    pub time: i64,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Bookmark {
    /// Build a live (non-deleted) row from a remote bookmark entry
    pub fn from_remote(remote: &RemoteBookmark, now: i64) -> Self {
        Self {
            bookmark_uuid: remote.bookmark_uuid.clone(),
            podcast_uuid: remote.podcast_uuid.clone(),
            episode_uuid: remote.episode_uuid.clone(),
            title: remote.title.clone(),
            time: remote.time,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fan-out progress for one sync run.
///
/// `completed` only ever increments, through a single-statement atomic
/// update; whichever increment observes `completed == expected` triggers
/// the history stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub run_id: String,
    pub completed: i64,
    pub expected: i64,
    pub updated_at: i64,
}

/// Convert a stored epoch-millisecond value back into an instant
pub(crate) fn datetime_from_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}
