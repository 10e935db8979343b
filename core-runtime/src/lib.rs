//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the podcast mirror:
//! - Logging and tracing infrastructure
//! - Configuration management
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the other crates depend on.
//! It establishes the logging conventions and the fail-fast configuration
//! pattern used throughout the workspace.

pub mod config;
pub mod error;
pub mod logging;

pub use config::CoreConfig;
pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat, LoggingConfig};
