//! # Store Adapter Module
//!
//! Durable SQLite persistence for the podcast mirror.
//!
//! ## Overview
//!
//! This crate owns the local store the sync engine writes into:
//! - **Models** (`models`): `Episode`, `Podcast`, `Bookmark` and the write
//!   payloads the engine produces
//! - **Connection pool** (`db`): WAL-mode SQLite pool with health checks and
//!   in-memory pools for tests
//! - **Repositories** (`repositories`): one trait + SQLite implementation
//!   per table, each creating its own schema on `initialize()`
//!
//! The engine only ever talks to repository traits; everything SQL-shaped
//! lives here. Batched writes run inside one transaction per batch, and the
//! sync-progress counter is mutated exclusively through a single-statement
//! atomic increment.

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use db::{create_pool, create_test_pool, initialize_store, DatabaseConfig};
pub use error::{LibraryError, Result};
pub use models::{
    Bookmark, Episode, EpisodeSyncUpdate, NewEpisode, PlayingStatus, Podcast, SyncProgress,
};
pub use repositories::{
    BookmarkRepository, CurrentSetRepository, EpisodeRepository, PodcastRepository,
    SqliteBookmarkRepository, SqliteEpisodeRepository, SqlitePodcastRepository,
    SqliteSyncProgressRepository, SyncProgressRepository,
};
