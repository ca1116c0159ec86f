//! CLI error types and conversions

use crate::config::ConfigError;
use crate::discovery::DiscoveryError;
use crate::report::PublishError;
use crate::resume::ResumeError;
use crate::scheduler::SchedulerError;
use crate::source::SourceError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// Discovery client error
    #[error("discovery error: {0}")]
    DiscoveryError(#[from] DiscoveryError),

    /// Checkpoint store error
    #[error("resume error: {0}")]
    ResumeError(#[from] ResumeError),

    /// Scheduling error
    #[error("run error: {0}")]
    SchedulerError(#[from] SchedulerError),

    /// Entity source error
    #[error("source error: {0}")]
    SourceError(#[from] SourceError),

    /// Publication error
    #[error("publish error: {0}")]
    PublishError(#[from] PublishError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
