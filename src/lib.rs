//! # Budget Pacing Monitor Library
//!
//! Scans advertising accounts in checkpointed batches, flags campaigns whose
//! spend today exceeds a percentage of their daily budget, and publishes the
//! result to a spreadsheet plus a summary email.
//!
//! ## Quick Start
//!
//! ```no_run
//! use budget_pacing_monitor::report::csv::CsvReportPublisher;
//! use budget_pacing_monitor::resume::{CheckpointStore, LocalBlobStore};
//! use budget_pacing_monitor::scheduler::{BatchScheduler, MonitorRun, RunOptions};
//! use budget_pacing_monitor::source::JsonFileEntitySource;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = JsonFileEntitySource::load("entities.json").await?;
//! let run = MonitorRun::new(
//!     Arc::new(source),
//!     CheckpointStore::new(LocalBlobStore::new("state"), "accounts.json"),
//!     Arc::new(CsvReportPublisher::new("reports")),
//!     BatchScheduler::new(50)?,
//!     RunOptions::default(),
//! );
//! run.execute().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`discovery`] - REST client driven by discovery documents
//! - [`resume`] - checkpoint list and its persistence
//! - [`scheduler`] - batch rotation, parallel fan-out, aggregation, the run itself
//! - [`source`] - account and campaign enumeration, pacing scan
//! - [`report`] - report rows, notification content, CSV publisher
//! - [`google`] - Sheets/Drive/Gmail publisher and Drive-backed checkpoints
//! - [`quota`] - outbound call budget
//! - [`config`] - TOML configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

/// CLI command implementations
pub mod cli;

/// Monitor configuration
pub mod config;

/// Discovery-driven REST client
pub mod discovery;

/// Google Workspace publisher and storage
pub mod google;

/// Metrics collection and export
pub mod metrics;

/// Outbound call quota
pub mod quota;

/// Report data and publication
pub mod report;

/// Checkpointed account rotation state
pub mod resume;

/// Batch scheduling and run orchestration
pub mod scheduler;

/// Account and campaign source
pub mod source;

pub use config::AppConfig;
pub use scheduler::{MonitorRun, RunOutcome, RunSummary};
