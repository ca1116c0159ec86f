//! Checkpointed batch rotation
//!
//! One run walks through:
//! 1. [`batch::BatchScheduler`] - reconcile checkpoints with live accounts, pick the oldest
//! 2. [`coordinator::ParallelCoordinator`] - scan the batch with bounded parallelism
//! 3. [`aggregate::ResultAggregator`] - merge outcomes, advance successful checkpoints
//! 4. [`runner::MonitorRun`] - ties the above to a source, a publisher and the store

pub mod aggregate;
pub mod batch;
pub mod coordinator;
pub mod runner;

pub use aggregate::{AggregateReport, ReportSection, ResultAggregator, SectionSummary, COMBINED_SECTION_NAME};
pub use batch::{reconcile, Batch, BatchScheduler};
pub use coordinator::{AccountHandler, AccountOutcome, ParallelCoordinator, WorkUnit, DEFAULT_ACCOUNT_TIMEOUT};
pub use runner::{MonitorRun, RunOptions, RunOutcome, RunSummary};

use crate::report::PublishError;
use crate::resume::ResumeError;
use crate::source::SourceError;

/// Run-fatal scheduling errors
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Batch size must be at least one
    #[error("invalid batch size: {0}")]
    InvalidBatchSize(usize),

    /// Checkpoint load or save failed
    #[error("checkpoint store error: {0}")]
    Resume(#[from] ResumeError),

    /// Account enumeration failed
    #[error("entity source error: {0}")]
    Source(#[from] SourceError),

    /// Report could not be published
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),
}

/// Result type for scheduling
pub type SchedulerResult<T> = Result<T, SchedulerError>;
