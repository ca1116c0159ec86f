//! Report rows, per-account worker output and publication
//!
//! - [`notification`] - subject, summary table and notify decision
//! - [`csv`] - local CSV publisher
//!
//! The Google Sheets/Drive/Gmail publisher lives in [`crate::google`].

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scheduler::AggregateReport;

pub mod csv;
pub mod notification;

/// Report columns, in output order
pub const COLUMNS: [&str; 9] = [
    "Account Name",
    "Account Number",
    "Campaign Name",
    "Campaign Id",
    "Budget Amount",
    "Spend Today",
    "Budget Pacing",
    "Impressions",
    "Clicks",
];

/// One campaign row keyed by column name
pub type ReportRow = IndexMap<String, Value>;

/// Render a cell as text; null renders empty
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Header row followed by each row's cells in [`COLUMNS`] order
pub fn tabulate(rows: &[ReportRow]) -> Vec<Vec<String>> {
    let mut table = Vec::with_capacity(rows.len() + 1);
    table.push(COLUMNS.iter().map(|c| c.to_string()).collect());
    for row in rows {
        table.push(COLUMNS.iter().map(|c| cell_text(row.get(*c))).collect());
    }
    table
}

/// Rows of one account scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    /// Matched rows
    pub rows: Vec<ReportRow>,
}

/// Output of a per-account scan, exchanged between the worker and the aggregator as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountReport {
    /// Customer the account belongs to
    pub customer_id: String,
    /// Account id
    pub account_id: String,
    /// Human-facing account number
    pub account_number: String,
    /// Account name
    pub account_name: String,
    /// Number of matched rows
    pub row_count: usize,
    /// Matched rows
    pub report_data: ReportData,
}

/// Publisher errors
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Remote API failure
    #[error("discovery client error: {0}")]
    Discovery(#[from] crate::discovery::DiscoveryError),

    /// Unexpected response shape
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Notification template failed to render
    #[error("template error: {0}")]
    Template(String),
}

/// Result type for publication
pub type PublishResult<T> = Result<T, PublishError>;

/// Run-level settings a publisher needs
#[derive(Debug, Clone)]
pub struct PublishContext {
    /// Human-readable run timestamp (configured locale and timezone)
    pub display_timestamp: String,
    /// Pacing threshold in percent
    pub threshold: u32,
    /// Notification recipients
    pub recipients: Vec<String>,
    /// Notify even when no rows matched
    pub always_notify: bool,
    /// Create a new timestamp-suffixed document per run instead of overwriting one
    pub new_document_each_run: bool,
    /// Base name of the destination document
    pub document_base_name: String,
}

impl PublishContext {
    /// Destination document name for this run
    pub fn document_name(&self) -> String {
        if self.new_document_each_run {
            format!("{} {}", self.document_base_name, self.display_timestamp)
        } else {
            self.document_base_name.clone()
        }
    }
}

/// What a publisher did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Identifier or location of the written document
    pub document: Option<String>,
    /// Whether a notification was sent
    pub notified: bool,
}

/// Writes the report somewhere and sends the notification
#[async_trait]
pub trait ReportPublisher: Send + Sync {
    /// Publish `report`
    async fn publish(&self, report: &AggregateReport, ctx: &PublishContext) -> PublishResult<PublishReceipt>;

    /// Short name for logs
    fn name(&self) -> &str;
}
