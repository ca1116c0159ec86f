//! Local CSV publisher
//!
//! Writes one CSV per report section into a directory named after the
//! document, plus `summary.html` whenever a notification would be sent.

use async_trait::async_trait;
use csv::Writer;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::notification::{self, SummaryLine};
use super::{tabulate, PublishContext, PublishError, PublishReceipt, PublishResult, ReportPublisher};
use crate::metrics;
use crate::scheduler::AggregateReport;

/// File written next to the CSVs when a notification is due
pub const SUMMARY_FILE_NAME: &str = "summary.html";

const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Replace characters that are unsafe in file names
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | ' ' | '-' | '_' | '(' | ')' | '.' => c,
            _ => '_',
        })
        .collect()
}

/// File stems for `names`, suffixed ` [n]` where sanitizing makes two collide
///
/// Collisions are checked case-insensitively so stems stay distinct on
/// case-folding filesystems.
pub fn unique_file_stems<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    names
        .into_iter()
        .map(|name| {
            let base = sanitize_file_name(name);
            let mut stem = base.clone();
            let mut n = 2;
            while !taken.insert(stem.to_lowercase()) {
                stem = format!("{base} [{n}]");
                n += 1;
            }
            stem
        })
        .collect()
}

/// Publishes reports as CSV files under a local directory
#[derive(Debug, Clone)]
pub struct CsvReportPublisher {
    output_dir: PathBuf,
}

impl CsvReportPublisher {
    /// Publisher writing below `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Directory the next publish writes into
    pub fn document_dir(&self, ctx: &PublishContext) -> PathBuf {
        self.output_dir.join(sanitize_file_name(&ctx.document_name()))
    }
}

fn write_section(path: &Path, table: &[Vec<String>]) -> PublishResult<()> {
    let file = File::create(path)
        .map_err(|e| PublishError::IoError(format!("Failed to create {}: {e}", path.display())))?;
    let mut writer = Writer::from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));

    for record in table {
        writer
            .write_record(record)
            .map_err(|e| PublishError::CsvError(format!("Failed to write row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| PublishError::IoError(format!("Failed to flush {}: {e}", path.display())))?;
    debug!(path = %path.display(), rows = table.len().saturating_sub(1), "Wrote report section");
    Ok(())
}

#[async_trait]
impl ReportPublisher for CsvReportPublisher {
    async fn publish(&self, report: &AggregateReport, ctx: &PublishContext) -> PublishResult<PublishReceipt> {
        let dir = self.document_dir(ctx);

        let mut files = Vec::with_capacity(report.sections.len());
        let mut lines = Vec::with_capacity(report.sections.len());
        let stems = unique_file_stems(report.sections.iter().map(|s| s.name.as_str()));
        for (section, stem) in report.sections.iter().zip(stems) {
            files.push((dir.join(format!("{stem}.csv")), tabulate(&section.rows)));
            lines.push(SummaryLine {
                summary: section.summary.clone(),
                section_id: stem,
            });
        }

        let summary = if notification::should_notify(report, ctx.always_notify) {
            let subject = notification::subject(report.total_rows(), ctx.threshold);
            let document_url = format!("file://{}", dir.display());
            Some(notification::render_summary_html(
                &subject,
                report.combined,
                &lines,
                &document_url,
                &ctx.display_timestamp,
            )?)
        } else {
            None
        };
        let notified = summary.is_some();

        let target = dir.clone();
        tokio::task::spawn_blocking(move || -> PublishResult<()> {
            std::fs::create_dir_all(&target)
                .map_err(|e| PublishError::IoError(format!("Failed to create directory: {e}")))?;
            for (path, table) in &files {
                write_section(path, table)?;
            }
            if let Some(html) = summary {
                std::fs::write(target.join(SUMMARY_FILE_NAME), html)
                    .map_err(|e| PublishError::IoError(format!("Failed to write summary: {e}")))?;
            }
            Ok(())
        })
        .await
        .map_err(|e| PublishError::IoError(e.to_string()))??;

        metrics::record_report_rows(report.total_rows());
        info!(
            dir = %dir.display(),
            sections = report.sections.len(),
            rows = report.total_rows(),
            notified,
            "Published CSV report"
        );

        Ok(PublishReceipt {
            document: Some(dir.display().to_string()),
            notified,
        })
    }

    fn name(&self) -> &str {
        "csv"
    }
}
