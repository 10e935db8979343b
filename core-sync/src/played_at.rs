//! # Monotonic Played-At Updater
//!
//! Applies the merged play history to stored episodes under the
//! forward-only invariant: a stored `played_at` may advance, never move
//! backwards. The comparison happens inside a single conditional UPDATE
//! per candidate, so concurrent appliers cannot interleave a stale write
//! between a read and a write.

use core_library::repositories::EpisodeRepository;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::history::PlayedEpisode;

/// Aggregate outcome of one apply pass; every candidate is counted exactly
/// once as either updated or skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// Candidates that advanced a stored timestamp (or set a null one)
    pub updated: u64,
    /// Candidates for unknown episodes, or with a timestamp at or behind
    /// the stored value
    pub skipped: u64,
}

/// Applies merged history entries to the episode store
pub struct PlayedAtUpdater {
    episodes: Arc<dyn EpisodeRepository>,
}

impl PlayedAtUpdater {
    /// Create a new updater
    pub fn new(episodes: Arc<dyn EpisodeRepository>) -> Self {
        Self { episodes }
    }

    /// Apply every candidate, returning the updated/skipped tally.
    ///
    /// Empty input returns `{0, 0}` without any store access.
    #[instrument(skip(self, entries), fields(candidates = entries.len()))]
    pub async fn apply(&self, entries: &[PlayedEpisode]) -> Result<UpdateStats> {
        if entries.is_empty() {
            return Ok(UpdateStats::default());
        }

        let mut stats = UpdateStats::default();

        for entry in entries {
            let advanced = self
                .episodes
                .update_played_at_if_newer(&entry.episode_uuid, entry.played_at)
                .await?;

            if advanced {
                stats.updated += 1;
            } else {
                stats.skipped += 1;
                debug!(
                    episode_uuid = %entry.episode_uuid,
                    played_at = %entry.played_at,
                    "Skipped play timestamp (unknown episode or not newer)"
                );
            }
        }

        info!(
            updated = stats.updated,
            skipped = stats.skipped,
            "Applied play history"
        );

        Ok(stats)
    }
}
