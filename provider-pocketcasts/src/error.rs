//! Error types for the Pocket Casts provider

use thiserror::Error;

/// Pocket Casts provider errors
#[derive(Error, Debug)]
pub enum PocketCastsError {
    /// API request returned a non-success status
    #[error("Pocket Casts API error (status {status_code}) for {resource}")]
    ApiError { status_code: u16, resource: String },

    /// Failed to parse an API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] bridge_traits::error::BridgeError),
}

/// Result type for Pocket Casts operations
pub type Result<T> = std::result::Result<T, PocketCastsError>;

impl From<PocketCastsError> for bridge_traits::error::BridgeError {
    fn from(error: PocketCastsError) -> Self {
        match error {
            PocketCastsError::ApiError {
                status_code,
                resource,
            } => bridge_traits::error::BridgeError::Api {
                status: status_code,
                resource,
            },
            PocketCastsError::ParseError(msg) => {
                bridge_traits::error::BridgeError::OperationFailed(format!(
                    "Parse error: {}",
                    msg
                ))
            }
            PocketCastsError::BridgeError(e) => e,
        }
    }
}
