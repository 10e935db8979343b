//! # Sync Task Queue
//!
//! Typed units of work for the fan-out pipeline, and the queue seam that
//! keeps the coordinator independent of any concrete work distributor.
//!
//! ## Overview
//!
//! The external distributor guarantees at-least-once, possibly-reordered
//! delivery; every task is therefore self-contained (podcast context rides
//! in the payload) and every handler is idempotent. Tasks serialize with
//! serde so they can cross a real message queue unchanged.
//!
//! [`LocalTaskQueue`] is the in-process implementation used by the binary
//! and by tests: an unbounded channel drained sequentially by the
//! coordinator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::episodes::PodcastMeta;
use crate::error::{Result, SyncError};

/// One independently schedulable, idempotent step of the sync pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncTask {
    /// Stage 1: reconcile subscriptions and bookmarks, then fan out
    FullSync { run_id: String },
    /// Stage 2: classify and persist one podcast's episode sync records
    PodcastEpisodes { run_id: String, podcast: PodcastMeta },
    /// Stage 3: merge play history and apply played-at updates
    PlayHistory { run_id: String },
}

impl SyncTask {
    /// Run this task belongs to
    pub fn run_id(&self) -> &str {
        match self {
            Self::FullSync { run_id }
            | Self::PodcastEpisodes { run_id, .. }
            | Self::PlayHistory { run_id } => run_id,
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FullSync { .. } => "full_sync",
            Self::PodcastEpisodes { .. } => "podcast_episodes",
            Self::PlayHistory { .. } => "play_history",
        }
    }
}

/// Work distributor seam.
///
/// Implementations accept tasks for later delivery; they must tolerate the
/// same task being submitted more than once.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Submit a single task
    async fn enqueue(&self, task: SyncTask) -> Result<()>;

    /// Submit a batch of tasks. Callers chunk large fan-outs to respect
    /// the distributor's maximum batch size before calling this.
    async fn enqueue_batch(&self, tasks: Vec<SyncTask>) -> Result<()> {
        for task in tasks {
            self.enqueue(task).await?;
        }
        Ok(())
    }
}

/// In-process task queue over an unbounded tokio channel
pub struct LocalTaskQueue {
    tx: mpsc::UnboundedSender<SyncTask>,
}

impl LocalTaskQueue {
    /// Create a queue and the receiver to drain it with
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SyncTask>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl TaskQueue for LocalTaskQueue {
    async fn enqueue(&self, task: SyncTask) -> Result<()> {
        self.tx
            .send(task)
            .map_err(|e| SyncError::Queue(format!("Queue receiver dropped: {}", e)))
    }
}
