//! # Pocket Casts Provider
//!
//! Typed connector for the Pocket Casts API, implementing the
//! [`PodcastService`](bridge_traits::remote::PodcastService) contract the
//! sync engine consumes.
//!
//! ## Components
//!
//! - **Connector** (`connector`): endpoint logic over the `HttpClient` seam
//! - **Types** (`types`): serde shapes for the wire responses, with explicit
//!   defaulting for absent fields
//! - **HTTP** (`http`): the default reqwest-backed `HttpClient`
//! - **Errors** (`error`): typed failures carrying HTTP status and resource

pub mod connector;
pub mod error;
pub mod http;
pub mod types;

pub use connector::PocketCastsConnector;
pub use error::{PocketCastsError, Result};
pub use http::ReqwestHttpClient;
