//! # Sync Coordinator
//!
//! Drives the three-stage mirror pipeline across independently scheduled
//! units of work, without a central blocking loop.
//!
//! ## Workflow
//!
//! ### Stage 1: `FullSync`
//! 1. Fetch and reconcile the current subscription set
//! 2. Fetch and reconcile the current bookmark set
//! 3. Reset the run's progress counter to the number of podcasts
//! 4. Enqueue one `PodcastEpisodes` task per podcast, in bounded batches
//!
//! ### Stage 2: `PodcastEpisodes` (once per podcast, any order)
//! 1. Fetch the podcast's sync records and cache metadata concurrently
//! 2. Run the episode delta classifier
//! 3. Atomically increment the progress counter; the unit that observes
//!    the expected total enqueues `PlayHistory` exactly once
//!
//! ### Stage 3: `PlayHistory`
//! 1. Merge the year-bucketed play history
//! 2. Apply it through the monotonic played-at updater
//!
//! Stage-2 units are idempotent: at-least-once delivery may rerun one, and
//! a rerun's extra increment overshoots the expected total without ever
//! equalling it again, so the history stage cannot double-fire.

use bridge_traits::remote::PodcastService;
use chrono::Utc;
use core_library::models::{Bookmark, Podcast};
use core_library::repositories::{
    BookmarkRepository, EpisodeRepository, PodcastRepository, SqliteBookmarkRepository,
    SqliteEpisodeRepository, SqlitePodcastRepository, SqliteSyncProgressRepository,
    SyncProgressRepository,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::episodes::{EpisodeClassifier, PodcastMeta};
use crate::error::{Result, SyncError};
use crate::history::HistoryMerger;
use crate::played_at::PlayedAtUpdater;
use crate::queue::{SyncTask, TaskQueue};
use crate::reconcile::reconcile_current_set;

/// Sync coordinator configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Access token for the remote service
    pub access_token: String,

    /// Maximum number of tasks submitted to the queue in one batch
    pub max_task_batch: usize,

    /// First year the history merger scans; `None` means the current
    /// calendar year
    pub history_start_year: Option<i32>,
}

impl SyncConfig {
    /// Create a configuration with defaults
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            max_task_batch: 100,
            history_start_year: None,
        }
    }

    /// Set the maximum task batch size
    pub fn max_task_batch(mut self, batch: usize) -> Self {
        self.max_task_batch = batch.max(1);
        self
    }

    /// Pin the first history year (tests, replays)
    pub fn history_start_year(mut self, year: i32) -> Self {
        self.history_start_year = Some(year);
        self
    }
}

/// Tally of a local drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Units of work that completed
    pub handled: u64,
    /// Units of work that failed (logged, not retried locally)
    pub failed: u64,
}

/// Coordinates the mirror pipeline
pub struct SyncCoordinator {
    config: SyncConfig,
    service: Arc<dyn PodcastService>,
    queue: Arc<dyn TaskQueue>,
    podcasts: Arc<dyn PodcastRepository>,
    bookmarks: Arc<dyn BookmarkRepository>,
    progress: Arc<dyn SyncProgressRepository>,
    classifier: EpisodeClassifier,
    updater: PlayedAtUpdater,
}

impl SyncCoordinator {
    /// Create a coordinator over the given pool, service and queue
    pub fn new(
        config: SyncConfig,
        service: Arc<dyn PodcastService>,
        queue: Arc<dyn TaskQueue>,
        pool: SqlitePool,
    ) -> Self {
        let episodes: Arc<dyn EpisodeRepository> =
            Arc::new(SqliteEpisodeRepository::new(pool.clone()));
        let podcasts: Arc<dyn PodcastRepository> =
            Arc::new(SqlitePodcastRepository::new(pool.clone()));
        let bookmarks: Arc<dyn BookmarkRepository> =
            Arc::new(SqliteBookmarkRepository::new(pool.clone()));
        let progress: Arc<dyn SyncProgressRepository> =
            Arc::new(SqliteSyncProgressRepository::new(pool));

        Self {
            config,
            service,
            queue,
            podcasts,
            bookmarks,
            progress,
            classifier: EpisodeClassifier::new(episodes.clone()),
            updater: PlayedAtUpdater::new(episodes),
        }
    }

    /// Mint a run id and enqueue stage 1.
    ///
    /// Both the manual trigger and the scheduler call this; overlapping
    /// runs are tolerated (reconciliation and classification are
    /// idempotent), each with its own progress row.
    pub async fn start_full_sync(&self) -> Result<String> {
        let run_id = Uuid::new_v4().to_string();

        self.queue
            .enqueue(SyncTask::FullSync {
                run_id: run_id.clone(),
            })
            .await?;

        info!(run_id = %run_id, "Enqueued full sync");
        Ok(run_id)
    }

    /// Handle one delivered unit of work
    pub async fn handle(&self, task: SyncTask) -> Result<()> {
        debug!(kind = task.kind(), run_id = task.run_id(), "Handling task");

        match task {
            SyncTask::FullSync { run_id } => self.sync_collections(&run_id).await,
            SyncTask::PodcastEpisodes { run_id, podcast } => {
                self.sync_podcast_episodes(&run_id, podcast).await
            }
            SyncTask::PlayHistory { run_id } => self.sync_play_history(&run_id).await,
        }
    }

    /// Drain an in-process queue until it runs dry.
    ///
    /// Failed units are logged and counted, not retried; with a real
    /// distributor redelivery would take care of them.
    pub async fn run_to_completion(
        &self,
        receiver: &mut mpsc::UnboundedReceiver<SyncTask>,
    ) -> DrainStats {
        let mut stats = DrainStats::default();

        while let Ok(task) = receiver.try_recv() {
            let kind = task.kind();
            match self.handle(task).await {
                Ok(()) => stats.handled += 1,
                Err(e) => {
                    error!(error = %e, kind, "Unit of work failed");
                    stats.failed += 1;
                }
            }
        }

        info!(
            handled = stats.handled,
            failed = stats.failed,
            "Queue drained"
        );

        stats
    }

    /// Stage 1: reconcile both current sets, then fan out per podcast
    #[instrument(skip(self), fields(run_id = %run_id))]
    async fn sync_collections(&self, run_id: &str) -> Result<()> {
        info!("Stage 1: Reconciling subscriptions and bookmarks");

        let token = &self.config.access_token;
        let now = Utc::now().timestamp();

        let remote_podcasts = self.service.fetch_podcasts(token).await?;
        let podcast_rows: Vec<Podcast> = remote_podcasts
            .iter()
            .map(|p| Podcast::from_remote(p, now))
            .collect();
        reconcile_current_set(self.podcasts.as_ref(), "podcasts", podcast_rows).await?;

        let remote_bookmarks = self.service.fetch_bookmarks(token).await?;
        let bookmark_rows: Vec<Bookmark> = remote_bookmarks
            .iter()
            .map(|b| Bookmark::from_remote(b, now))
            .collect();
        reconcile_current_set(self.bookmarks.as_ref(), "bookmarks", bookmark_rows).await?;

        // Reset before any stage-2 unit can increment.
        self.progress
            .reset(run_id, remote_podcasts.len() as i64)
            .await?;

        if remote_podcasts.is_empty() {
            // No stage-2 unit will ever observe the counter reaching its
            // target, so the history stage starts here instead.
            info!("No subscribed podcasts; skipping straight to history stage");
            self.queue
                .enqueue(SyncTask::PlayHistory {
                    run_id: run_id.to_string(),
                })
                .await?;
            return Ok(());
        }

        let tasks: Vec<SyncTask> = remote_podcasts
            .iter()
            .map(|p| SyncTask::PodcastEpisodes {
                run_id: run_id.to_string(),
                podcast: PodcastMeta::from(p),
            })
            .collect();

        for chunk in tasks.chunks(self.config.max_task_batch) {
            self.queue.enqueue_batch(chunk.to_vec()).await?;
        }

        info!(
            podcasts = remote_podcasts.len(),
            "Stage 1 complete; per-podcast fan-out enqueued"
        );

        Ok(())
    }

    /// Stage 2: classify one podcast's episodes, then advance the counter
    #[instrument(skip(self, podcast), fields(run_id = %run_id, podcast_uuid = %podcast.uuid))]
    async fn sync_podcast_episodes(&self, run_id: &str, podcast: PodcastMeta) -> Result<()> {
        let token = &self.config.access_token;

        // Two independent reads; no reason to serialize them.
        let (records, cache) = tokio::try_join!(
            async {
                self.service
                    .fetch_episode_sync(token, &podcast.uuid)
                    .await
                    .map_err(SyncError::from)
            },
            async {
                self.service
                    .fetch_episode_cache(&podcast.uuid)
                    .await
                    .map_err(SyncError::from)
            },
        )?;

        let outcome = self
            .classifier
            .sync_podcast_episodes(records, &cache, &podcast)
            .await?;

        let (completed, expected) = self.progress.increment_and_get(run_id).await?;
        debug!(
            completed,
            expected,
            updated = outcome.updated,
            inserted = outcome.inserted,
            "Podcast unit complete"
        );

        if completed == expected {
            info!("Last podcast unit finished; triggering history stage");
            self.queue
                .enqueue(SyncTask::PlayHistory {
                    run_id: run_id.to_string(),
                })
                .await?;
        }

        Ok(())
    }

    /// Stage 3: merge play history and apply it under monotonicity
    #[instrument(skip(self), fields(run_id = %run_id))]
    async fn sync_play_history(&self, run_id: &str) -> Result<()> {
        info!("Stage 3: Merging play history");

        let mut merger = HistoryMerger::new(self.service.clone());
        if let Some(year) = self.config.history_start_year {
            merger = merger.with_start_year(year);
        }

        let history = merger.merge(&self.config.access_token).await?;
        let stats = self.updater.apply(&history).await?;

        info!(
            entries = history.len(),
            updated = stats.updated,
            skipped = stats.skipped,
            "History stage complete"
        );

        Ok(())
    }
}
