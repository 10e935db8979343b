use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Remote service error: {0}")]
    Remote(#[from] bridge_traits::error::BridgeError),

    #[error("Store error: {0}")]
    Store(#[from] core_library::LibraryError),

    #[error("Invalid play timestamp {millis} for episode {episode_uuid}")]
    InvalidPlayedAt { episode_uuid: String, millis: i64 },

    #[error("Task queue error: {0}")]
    Queue(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
