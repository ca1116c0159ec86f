//! Google Workspace destinations
//!
//! - [`drive`] - file lookup/creation, sharing, and checkpoint blobs stored as Drive documents
//! - [`sheets`] - tab creation and bulk cell writes
//! - [`gmail`] - raw message send
//!
//! Each API is a [`ServiceHandle`] built from its discovery document the first
//! time it is needed and reused for the rest of the run.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::discovery::{Credentials, DiscoveryResult, ServiceBuilder, ServiceHandle};
use crate::metrics;
use crate::report::notification::{self, SummaryLine};
use crate::report::{tabulate, PublishContext, PublishReceipt, PublishResult, ReportPublisher};
use crate::scheduler::AggregateReport;

pub mod drive;
pub mod gmail;
pub mod sheets;

pub use drive::DriveBlobStore;

/// Sheets v4 discovery document
pub const SHEETS_DISCOVERY_URL: &str = "https://sheets.googleapis.com/$discovery/rest?version=v4";
/// Drive v3 discovery document
pub const DRIVE_DISCOVERY_URL: &str = "https://www.googleapis.com/discovery/v1/apis/drive/v3/rest";
/// Gmail v1 discovery document
pub const GMAIL_DISCOVERY_URL: &str = "https://www.googleapis.com/discovery/v1/apis/gmail/v1/rest";

/// Discovery document locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryUrls {
    /// Sheets API
    pub sheets: String,
    /// Drive API
    pub drive: String,
    /// Gmail API
    pub gmail: String,
}

impl Default for DiscoveryUrls {
    fn default() -> Self {
        Self {
            sheets: SHEETS_DISCOVERY_URL.to_string(),
            drive: DRIVE_DISCOVERY_URL.to_string(),
            gmail: GMAIL_DISCOVERY_URL.to_string(),
        }
    }
}

/// Lazily built Sheets, Drive and Gmail services sharing one set of credentials
pub struct GoogleServices {
    builder: ServiceBuilder,
    credentials: Credentials,
    urls: DiscoveryUrls,
    sheets: OnceCell<ServiceHandle>,
    drive: OnceCell<ServiceHandle>,
    gmail: OnceCell<ServiceHandle>,
}

impl GoogleServices {
    /// Services built on demand with `builder`
    pub fn new(builder: ServiceBuilder, credentials: Credentials, urls: DiscoveryUrls) -> Self {
        Self {
            builder,
            credentials,
            urls,
            sheets: OnceCell::new(),
            drive: OnceCell::new(),
            gmail: OnceCell::new(),
        }
    }

    async fn service<'a>(&self, cell: &'a OnceCell<ServiceHandle>, url: &str) -> DiscoveryResult<&'a ServiceHandle> {
        cell.get_or_try_init(|| async {
            debug!(url, "Building service");
            self.builder.build(url, &self.credentials).await
        })
        .await
    }

    /// Sheets service
    pub async fn sheets(&self) -> DiscoveryResult<&ServiceHandle> {
        self.service(&self.sheets, &self.urls.sheets).await
    }

    /// Drive service
    pub async fn drive(&self) -> DiscoveryResult<&ServiceHandle> {
        self.service(&self.drive, &self.urls.drive).await
    }

    /// Gmail service
    pub async fn gmail(&self) -> DiscoveryResult<&ServiceHandle> {
        self.service(&self.gmail, &self.urls.gmail).await
    }
}

/// Publishes to a Google spreadsheet and mails the summary
pub struct GoogleReportPublisher {
    services: Arc<GoogleServices>,
}

impl GoogleReportPublisher {
    /// Publisher using `services`
    pub fn new(services: Arc<GoogleServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl ReportPublisher for GoogleReportPublisher {
    async fn publish(&self, report: &AggregateReport, ctx: &PublishContext) -> PublishResult<PublishReceipt> {
        if report.sections.is_empty() {
            info!("No sections to publish");
            return Ok(PublishReceipt::default());
        }

        let drive = self.services.drive().await?;
        let sheets = self.services.sheets().await?;

        let name = ctx.document_name();
        let spreadsheet_id = drive::create_file_if_not_exists(drive, &name, drive::SPREADSHEET_MIME_TYPE).await?;

        let names: Vec<String> = report.sections.iter().map(|s| s.name.clone()).collect();
        let sheet_ids = sheets::get_or_create_sheets(sheets, &spreadsheet_id, &names).await?;

        let mut writes = Vec::with_capacity(report.sections.len());
        let mut lines = Vec::with_capacity(report.sections.len());
        for section in &report.sections {
            let sheet_id = sheets::sheet_id(&sheet_ids, &section.name)?;
            writes.push(sheets::SheetRows {
                sheet_id,
                rows: tabulate(&section.rows),
            });
            lines.push(SummaryLine {
                summary: section.summary.clone(),
                section_id: sheet_id.to_string(),
            });
        }
        sheets::write_rows(sheets, &spreadsheet_id, &writes).await?;
        metrics::record_report_rows(report.total_rows());

        info!(
            spreadsheet_id = %spreadsheet_id,
            sheets = writes.len(),
            rows = report.total_rows(),
            "Wrote report spreadsheet"
        );

        if !notification::should_notify(report, ctx.always_notify) {
            return Ok(PublishReceipt {
                document: Some(spreadsheet_id),
                notified: false,
            });
        }

        let subject = notification::subject(report.total_rows(), ctx.threshold);
        let file_url = drive::share_with_link(drive, &spreadsheet_id).await?;
        let html = notification::render_summary_html(&subject, report.combined, &lines, &file_url, &ctx.display_timestamp)?;

        let gmail = self.services.gmail().await?;
        for address in &ctx.recipients {
            gmail::send_html(gmail, address, &subject, &html).await?;
        }
        info!(recipients = ctx.recipients.len(), "Sent summary email");

        Ok(PublishReceipt {
            document: Some(spreadsheet_id),
            notified: true,
        })
    }

    fn name(&self) -> &str {
        "google"
    }
}
