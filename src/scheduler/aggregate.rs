//! Merging per-account outcomes into one report
//!
//! Failed accounts are logged and left out; their checkpoints stay where they
//! were so the next run picks them up first. Successful accounts are advanced
//! to the run timestamp.

use serde::Serialize;
use tracing::{info, warn};

use crate::report::{AccountReport, ReportRow};
use crate::resume::CheckpointList;

use super::coordinator::AccountOutcome;

/// Section name used when all accounts are combined
pub const COMBINED_SECTION_NAME: &str = "All accounts";

/// Summary line for one report section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionSummary {
    /// Customer id; absent for the combined section
    pub customer_id: Option<String>,
    /// Account id; absent for the combined section
    pub account_id: Option<String>,
    /// Account number; absent for the combined section
    pub account_number: Option<String>,
    /// Account name; absent for the combined section
    pub account_name: Option<String>,
    /// Rows in the section
    pub row_count: usize,
}

/// One named block of rows (a sheet tab, a CSV file)
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    /// Section name
    pub name: String,
    /// Matched rows
    pub rows: Vec<ReportRow>,
    /// Summary line
    pub summary: SectionSummary,
}

/// Consolidated result of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateReport {
    /// Whether all accounts share one section
    pub combined: bool,
    /// Sections in output order
    pub sections: Vec<ReportSection>,
    /// Accounts that produced a result
    pub succeeded: Vec<String>,
    /// Accounts that produced no result this run
    pub failed: Vec<String>,
}

impl AggregateReport {
    /// Rows across all sections
    pub fn total_rows(&self) -> usize {
        self.sections.iter().map(|s| s.summary.row_count).sum()
    }
}

/// Merges outcomes and advances checkpoints of successful accounts
#[derive(Debug, Clone, Copy)]
pub struct ResultAggregator {
    combine: bool,
}

impl ResultAggregator {
    /// Aggregator producing one combined section (`true`) or one per account
    pub fn new(combine_all_accounts: bool) -> Self {
        Self {
            combine: combine_all_accounts,
        }
    }

    /// Build the report and the updated checkpoint list
    pub fn aggregate(
        &self,
        outcomes: Vec<AccountOutcome>,
        mut checkpoints: CheckpointList,
        run_timestamp: &str,
    ) -> (AggregateReport, CheckpointList) {
        let mut results: Vec<AccountReport> = Vec::new();
        let mut report = AggregateReport {
            combined: self.combine,
            ..AggregateReport::default()
        };

        for outcome in outcomes {
            match outcome {
                AccountOutcome::Failed { account_id, error } => {
                    warn!(account_id = %account_id, error = %error, "Got an error in result");
                    report.failed.push(account_id);
                }
                AccountOutcome::Succeeded { account_id, payload } => {
                    let parsed = match serde_json::from_str::<AccountReport>(&payload) {
                        Ok(parsed) => parsed,
                        Err(e) => {
                            warn!(account_id = %account_id, error = %e, "Unreadable account result");
                            report.failed.push(account_id);
                            continue;
                        }
                    };

                    match checkpoints.get_mut(&account_id) {
                        Some(checkpoint) => checkpoint.mark_checked(run_timestamp),
                        None => warn!(account_id = %account_id, "No checkpoint for processed account"),
                    }

                    report.succeeded.push(account_id);
                    results.push(parsed);
                }
            }
        }

        report.sections = if self.combine {
            let rows: Vec<ReportRow> = results.into_iter().flat_map(|r| r.report_data.rows).collect();
            vec![ReportSection {
                name: COMBINED_SECTION_NAME.to_string(),
                summary: SectionSummary {
                    row_count: rows.len(),
                    ..SectionSummary::default()
                },
                rows,
            }]
        } else {
            results.into_iter().map(section_for_account).collect()
        };

        info!(
            sections = report.sections.len(),
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            total_rows = report.total_rows(),
            "Aggregated account results"
        );

        (report, checkpoints)
    }
}

fn section_for_account(result: AccountReport) -> ReportSection {
    let rows = result.report_data.rows;
    ReportSection {
        name: format!("{} ({})", result.account_id, result.account_number),
        summary: SectionSummary {
            customer_id: Some(result.customer_id),
            account_id: Some(result.account_id),
            account_number: Some(result.account_number),
            account_name: Some(result.account_name),
            row_count: rows.len(),
        },
        rows,
    }
}
