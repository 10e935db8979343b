//! # Core Configuration Module
//!
//! Provides configuration management for the podcast mirror.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `CoreConfig` instance holding the settings every component needs: the
//! database location, the remote service endpoints and the access token.
//! It enforces fail-fast validation so a misconfigured process dies at
//! startup rather than mid-sync.
//!
//! ## Usage
//!
//! ### Explicit configuration
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/var/lib/podmirror/podmirror.db")
//!     .access_token("secret-token")
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ### From the environment
//!
//! ```ignore
//! // PODMIRROR_TOKEN is required; everything else has a default.
//! let config = CoreConfig::from_env()?;
//! ```

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Default API endpoint of the remote podcast service
pub const DEFAULT_API_BASE_URL: &str = "https://api.pocketcasts.com";

/// Default endpoint of the public episode metadata cache
pub const DEFAULT_CACHE_BASE_URL: &str = "https://podcast-api.pocketcasts.com";

/// Default maximum number of tasks submitted to the work queue in one batch
pub const DEFAULT_MAX_TASK_BATCH: usize = 100;

/// Core configuration for the podcast mirror.
///
/// Use [`CoreConfig::builder`] or [`CoreConfig::from_env`] to construct
/// instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Base URL of the authenticated remote API
    pub api_base_url: String,

    /// Base URL of the unauthenticated episode metadata cache
    pub cache_base_url: String,

    /// Access token for the remote service (credential exchange happens
    /// outside this system; the token arrives ready to use)
    pub access_token: String,

    /// Maximum number of sync tasks enqueued per batch
    pub max_task_batch: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("api_base_url", &self.api_base_url)
            .field("cache_base_url", &self.cache_base_url)
            .field("access_token", &"<redacted>")
            .field("max_task_batch", &self.max_task_batch)
            .finish()
    }
}

impl CoreConfig {
    /// Start building a configuration
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Load configuration from `PODMIRROR_*` environment variables.
    ///
    /// | Variable                  | Default |
    /// |---------------------------|---------|
    /// | `PODMIRROR_DATABASE`      | `podmirror.db` |
    /// | `PODMIRROR_API_URL`       | [`DEFAULT_API_BASE_URL`] |
    /// | `PODMIRROR_CACHE_URL`     | [`DEFAULT_CACHE_BASE_URL`] |
    /// | `PODMIRROR_TOKEN`         | required |
    /// | `PODMIRROR_MAX_TASK_BATCH`| [`DEFAULT_MAX_TASK_BATCH`] |
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder();

        if let Ok(path) = std::env::var("PODMIRROR_DATABASE") {
            builder = builder.database_path(path);
        }
        if let Ok(url) = std::env::var("PODMIRROR_API_URL") {
            builder = builder.api_base_url(url);
        }
        if let Ok(url) = std::env::var("PODMIRROR_CACHE_URL") {
            builder = builder.cache_base_url(url);
        }
        if let Ok(token) = std::env::var("PODMIRROR_TOKEN") {
            builder = builder.access_token(token);
        }
        if let Ok(batch) = std::env::var("PODMIRROR_MAX_TASK_BATCH") {
            let batch = batch.parse::<usize>().map_err(|e| {
                Error::Config(format!("PODMIRROR_MAX_TASK_BATCH is not a number: {}", e))
            })?;
            builder = builder.max_task_batch(batch);
        }

        builder.build()
    }
}

/// Builder for [`CoreConfig`]
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    api_base_url: Option<String>,
    cache_base_url: Option<String>,
    access_token: Option<String>,
    max_task_batch: Option<usize>,
}

impl CoreConfigBuilder {
    /// Set the SQLite database path
    pub fn database_path(mut self, path: impl AsRef<Path>) -> Self {
        self.database_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the remote API base URL
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Set the episode cache base URL
    pub fn cache_base_url(mut self, url: impl Into<String>) -> Self {
        self.cache_base_url = Some(url.into());
        self
    }

    /// Set the remote service access token (required)
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Set the maximum task batch size
    pub fn max_task_batch(mut self, batch: usize) -> Self {
        self.max_task_batch = Some(batch);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the access token is missing or a
    /// value is out of range.
    pub fn build(self) -> Result<CoreConfig> {
        let access_token = self.access_token.ok_or_else(|| {
            Error::Config(
                "No access token provided. Set PODMIRROR_TOKEN or call access_token()."
                    .to_string(),
            )
        })?;

        if access_token.trim().is_empty() {
            return Err(Error::Config("Access token is empty".to_string()));
        }

        let max_task_batch = self.max_task_batch.unwrap_or(DEFAULT_MAX_TASK_BATCH);
        if max_task_batch == 0 {
            return Err(Error::Config("max_task_batch must be at least 1".to_string()));
        }

        Ok(CoreConfig {
            database_path: self
                .database_path
                .unwrap_or_else(|| PathBuf::from("podmirror.db")),
            api_base_url: self
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            cache_base_url: self
                .cache_base_url
                .unwrap_or_else(|| DEFAULT_CACHE_BASE_URL.to_string()),
            access_token,
            max_task_batch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_with_defaults() {
        let config = CoreConfig::builder()
            .access_token("token")
            .build()
            .unwrap();

        assert_eq!(config.database_path, PathBuf::from("podmirror.db"));
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.cache_base_url, DEFAULT_CACHE_BASE_URL);
        assert_eq!(config.max_task_batch, DEFAULT_MAX_TASK_BATCH);
    }

    #[test]
    fn test_builder_requires_token() {
        let result = CoreConfig::builder().database_path("test.db").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_rejects_empty_token() {
        let result = CoreConfig::builder().access_token("   ").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_rejects_zero_batch() {
        let result = CoreConfig::builder()
            .access_token("token")
            .max_task_batch(0)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = CoreConfig::builder()
            .access_token("very-secret")
            .build()
            .unwrap();

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("very-secret"));
    }
}
