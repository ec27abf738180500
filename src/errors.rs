/*!
 * Error types for the wordlens engine.
 *
 * This module contains custom error types for different parts of the engine,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use thiserror::Error;

/// Errors that can occur when submitting requests to a translation provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The provider entry requires an API key but none is configured
    #[error("Missing credential for provider: {0}")]
    MissingCredential(String),

    /// Error when making a gateway request fails
    #[error("Gateway request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing a gateway response fails
    #[error("Failed to parse gateway response: {0}")]
    ParseError(String),

    /// Error returned by the vendor itself
    #[error("Provider responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the vendor payload
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),
}

/// Errors that can occur while reaching into a document context
///
/// These are expected and non-fatal: discovery retries them up to a ceiling
/// and then degrades to aggressive monitoring rather than propagating.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccessError {
    /// The embedded content has no inner tree yet
    #[error("Embedded content not loaded yet")]
    NotLoaded,

    /// The host denied access to the inner tree
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The context's underlying tree has been detached
    #[error("Document context detached")]
    ContextDetached,

    /// The adapter does not implement this optional capability
    #[error("Capability not supported by host adapter")]
    Unsupported,
}

/// Errors that can occur during account-sync attempts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// The gateway rejected the credentials
    #[error("Sync authentication failed: {0}")]
    Authentication(String),

    /// The gateway asked us to back off
    #[error("Sync rate limited: {0}")]
    RateLimited(String),

    /// Any other gateway-side failure
    #[error("Sync gateway error: {0}")]
    Gateway(String),

    /// The bounded retry budget was spent without a success
    #[error("Sync failed after {attempts} attempts")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
    },
}

/// Main engine error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error loading or validating configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a provider gateway
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error reaching a document context
    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    /// Error from the sync scheduler
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::Config(error.to_string())
    }
}
