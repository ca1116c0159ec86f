//! Discovery-driven REST client
//!
//! Builds a callable service from a machine-readable discovery document and
//! executes its operations with a bearer token.
//!
//! - [`document`] - typed discovery document (resources, operations, parameter rules)
//! - [`token`] - access token resolution (pre-issued token or refresh-token exchange)
//! - [`service`] - [`ServiceBuilder`] and the bound [`ServiceHandle`]
//! - [`request`] - URL and payload construction for a single call
//! - [`shared_resources`] - process-wide HTTP client

pub mod document;
pub mod request;
pub mod service;
pub mod shared_resources;
pub mod token;

pub use document::{MediaUpload, Operation, ParameterRule, Resource, ServiceDescriptor};
pub use request::{ApiResponse, UploadParams, UploadType};
pub use service::{ServiceBuilder, ServiceHandle};
pub use token::{Credentials, TokenProvider};

/// Discovery client errors
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Token exchange failed; carries the raw token endpoint response
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Discovery document could not be fetched or parsed
    #[error("failed to fetch discovery document: {0}")]
    DiscoveryFetch(String),

    /// Discovery document is structurally unusable
    #[error("invalid discovery document: {0}")]
    InvalidDescriptor(String),

    /// Operation path not present in the descriptor
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// URL parameter not defined by the operation or the standard parameters
    #[error("unexpected url parameter {name} for operation {operation}")]
    UnknownParameter {
        /// Operation path
        operation: String,
        /// Parameter name supplied by the caller
        name: String,
    },

    /// Parameter rule location is neither `path` nor `query`
    #[error("unknown location {location} for url parameter {name}")]
    UnknownParameterLocation {
        /// Parameter name
        name: String,
        /// Location declared by the descriptor
        location: String,
    },

    /// Upload requested for an operation without media upload support
    #[error("media upload is not supported by operation {0}")]
    UnsupportedUpload(String),

    /// Upload type unknown or not declared by the operation
    #[error("upload protocol {0} is not supported")]
    UnsupportedUploadType(String),

    /// Remote call returned a non-2xx status; message is the raw response body
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The run's call quota has been used up
    #[error("call quota exhausted: {0}")]
    QuotaExhausted(#[from] crate::quota::QuotaError),

    /// Request body could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for discovery client operations
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;
