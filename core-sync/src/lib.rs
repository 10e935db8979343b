//! # Incremental Sync Engine
//!
//! Orchestrates the incremental mirror of a remote podcast account into the
//! local store.
//!
//! ## Overview
//!
//! This crate owns the logic with real invariants:
//! - Walking the year-bucketed remote history API into a deduplicated
//!   "true" play history
//! - Classifying remote episode records into new-vs-existing to minimize
//!   writes
//! - Applying play timestamps under the forward-only monotonicity rule
//! - Reconciling remote "current sets" with soft-delete/restore semantics
//! - Fanning the work out across idempotent, progress-tracked units
//!
//! ## Components
//!
//! - **History Merger** (`history`): newest-first year scan with a count
//!   probe and first-sighting-wins deduplication
//! - **Episode Delta Classifier** (`episodes`): update/insert partitioning
//!   against the store, joined with the episode cache
//! - **Played-At Updater** (`played_at`): monotonic timestamp application
//! - **Set Reconciler** (`reconcile`): one mechanism for podcasts and
//!   bookmarks
//! - **Task Queue** (`queue`): typed units of work over a distributor seam
//! - **Sync Coordinator** (`coordinator`): the three-stage pipeline

pub mod coordinator;
pub mod episodes;
pub mod error;
pub mod history;
pub mod played_at;
pub mod queue;
pub mod reconcile;

pub use coordinator::{DrainStats, SyncConfig, SyncCoordinator};
pub use episodes::{ClassifyOutcome, EpisodeClassifier, PodcastMeta};
pub use error::{Result, SyncError};
pub use history::{HistoryMerger, PlayedEpisode, HISTORY_FLOOR_YEAR, PLAY_ACTION};
pub use played_at::{PlayedAtUpdater, UpdateStats};
pub use queue::{LocalTaskQueue, SyncTask, TaskQueue};
pub use reconcile::{reconcile_current_set, ReconcileOutcome};
