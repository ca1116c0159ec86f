//! Durable rotation state
//!
//! Remembers which accounts were scanned and when, so independent runs resume
//! the rotation where the previous one stopped.

pub mod checkpoint;
pub mod store;

pub use checkpoint::{checkpoint_timestamp, AccountCheckpoint, CheckpointList};
pub use store::{BlobStore, CheckpointStore, LocalBlobStore};

/// Checkpoint persistence errors
#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Stored blob is not a valid checkpoint list
    #[error("deserialization error: {0}")]
    DeserializationError(String),

    /// Stored blob exceeds the size cap
    #[error("checkpoint blob too large: {size} bytes (max {max})")]
    StateTooLarge {
        /// Blob size in bytes
        size: u64,
        /// Maximum accepted size
        max: u64,
    },

    /// Remote blob store failure
    #[error("remote store error: {0}")]
    Remote(String),
}

/// Result type for checkpoint persistence
pub type ResumeResult<T> = Result<T, ResumeError>;
