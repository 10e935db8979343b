//! # Service Bridge Traits
//!
//! Contract crate between the sync engine and its external collaborators.
//!
//! ## Overview
//!
//! This crate defines the seams the core engine depends on but does not
//! implement itself:
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with bearer
//!   auth, implemented by the provider crate's reqwest client
//! - [`PodcastService`](remote::PodcastService) - Typed access to the remote
//!   podcast service (history, episode sync, episode cache, subscriptions,
//!   bookmarks), implemented by `provider-pocketcasts`
//!
//! Keeping these traits in a dependency-light crate lets `core-sync` consume
//! the remote service without depending on any concrete connector, and lets
//! tests substitute mocks for either seam.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Remote API
//! failures carry the HTTP status and the resource that was being fetched
//! (a year bucket or an entity id), which the engine treats as fatal for the
//! enclosing operation.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent
//! usage across async tasks.

pub mod error;
pub mod http;
pub mod remote;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use remote::{
    CachedEpisode, EpisodeCache, EpisodeSyncRecord, HistoryChange, HistoryPage, PodcastService,
    RemoteBookmark, RemotePodcast,
};
