//! One scheduling pass from quota check to persisted checkpoints

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

use super::{BatchScheduler, ParallelCoordinator, ResultAggregator, SchedulerResult, WorkUnit};
use crate::config::{self, AppConfig, ConfigError};
use crate::quota::{self, CallBudget, QuotaSource, MIN_REMAINING_QUOTA};
use crate::report::{PublishContext, ReportPublisher};
use crate::resume::{checkpoint_timestamp, BlobStore, CheckpointStore};
use crate::source::{EntitySource, PacingScanner};

/// Run-level settings
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Pacing threshold in percent
    pub threshold: u32,
    /// Notification recipients
    pub recipients: Vec<String>,
    /// Notify even when nothing matched
    pub always_notify: bool,
    /// Timestamp-suffixed document per run
    pub new_document_each_run: bool,
    /// Destination document base name
    pub document_base_name: String,
    /// Locale for human-facing timestamps
    pub locale: String,
    /// Timezone for human-facing timestamps
    pub timezone: Tz,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            threshold: 0,
            recipients: Vec::new(),
            always_notify: false,
            new_document_each_run: true,
            document_base_name: config::spreadsheet_file_name(),
            locale: "en-US".to_string(),
            timezone: chrono_tz::America::New_York,
        }
    }
}

impl RunOptions {
    /// Options taken from the monitor configuration
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            threshold: config.pacing_threshold,
            recipients: config.recipients.clone(),
            always_notify: config.send_email_even_if_no_rows,
            new_document_each_run: config.new_spreadsheet_each_run,
            document_base_name: config::spreadsheet_file_name(),
            locale: config.datetime_locale.clone(),
            timezone: config.timezone()?,
        })
    }

    fn publish_context(&self, now: DateTime<Utc>) -> PublishContext {
        PublishContext {
            display_timestamp: config::format_timestamp(now, self.timezone, &self.locale),
            threshold: self.threshold,
            recipients: self.recipients.clone(),
            always_notify: self.always_notify,
            new_document_each_run: self.new_document_each_run,
            document_base_name: self.document_base_name.clone(),
        }
    }
}

/// What a completed run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Accounts selected for this run, oldest first
    pub batch: Vec<String>,
    /// Accounts scanned successfully
    pub succeeded: Vec<String>,
    /// Accounts that produced no result
    pub failed: Vec<String>,
    /// Rows published
    pub total_rows: usize,
    /// Whether a notification went out
    pub notified: bool,
    /// Published document, if any
    pub document: Option<String>,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Not enough call quota; nothing was touched
    QuotaExhausted {
        /// Calls remaining
        remaining: usize,
    },
    /// Run went through
    Completed(RunSummary),
}

/// A configured monitor pass
pub struct MonitorRun<B> {
    source: Arc<dyn EntitySource>,
    store: CheckpointStore<B>,
    publisher: Arc<dyn ReportPublisher>,
    quota: Arc<dyn QuotaSource>,
    scheduler: BatchScheduler,
    coordinator: ParallelCoordinator,
    aggregator: ResultAggregator,
    options: RunOptions,
}

impl<B: BlobStore> MonitorRun<B> {
    /// Run with default batch size, concurrency, quota and a combined report
    pub fn new(
        source: Arc<dyn EntitySource>,
        store: CheckpointStore<B>,
        publisher: Arc<dyn ReportPublisher>,
        scheduler: BatchScheduler,
        options: RunOptions,
    ) -> Self {
        Self {
            source,
            store,
            publisher,
            quota: Arc::new(CallBudget::new(config::DAILY_CALL_QUOTA)),
            coordinator: ParallelCoordinator::new(scheduler.batch_size()),
            scheduler,
            aggregator: ResultAggregator::new(true),
            options,
        }
    }

    /// Use `quota` for the pre-run check
    pub fn with_quota(mut self, quota: Arc<dyn QuotaSource>) -> Self {
        self.quota = quota;
        self
    }

    /// Use a specific coordinator
    pub fn with_coordinator(mut self, coordinator: ParallelCoordinator) -> Self {
        self.coordinator = coordinator;
        self
    }

    /// Combine all accounts into one section (`true`) or one section per account
    pub fn with_combined_report(mut self, combine: bool) -> Self {
        self.aggregator = ResultAggregator::new(combine);
        self
    }

    /// Checkpoint store in use
    pub fn store(&self) -> &CheckpointStore<B> {
        &self.store
    }

    /// Run now
    pub async fn execute(&self) -> SchedulerResult<RunOutcome> {
        self.execute_at(Utc::now()).await
    }

    /// Run as if the current time were `now`
    pub async fn execute_at(&self, now: DateTime<Utc>) -> SchedulerResult<RunOutcome> {
        let span = tracing::info_span!("monitor_run", publisher = self.publisher.name());
        self.run(now).instrument(span).await
    }

    async fn run(&self, now: DateTime<Utc>) -> SchedulerResult<RunOutcome> {
        if let Err(e) = quota::precheck(self.quota.as_ref(), MIN_REMAINING_QUOTA) {
            let remaining = self.quota.remaining_daily_quota();
            warn!(remaining, error = %e, "Not enough call quota to run now");
            return Ok(RunOutcome::QuotaExhausted { remaining });
        }

        let live: Vec<String> = self.source.accounts().await?.map(|account| account.id).collect();
        let batch = self.scheduler.next_batch(&self.store, &live).await?;

        if batch.is_empty() {
            info!("No accounts to check");
            return Ok(RunOutcome::Completed(RunSummary::default()));
        }

        let batch_ids = batch.account_ids();
        let scanner = Arc::new(PacingScanner::new(self.source.clone(), self.options.threshold));
        let units: Vec<WorkUnit> = batch.selected.into_iter().map(WorkUnit::from).collect();
        let outcomes = self.coordinator.run(scanner, units).await;

        let (report, checkpoints) = self
            .aggregator
            .aggregate(outcomes, batch.checkpoints, &checkpoint_timestamp(now));

        let ctx = self.options.publish_context(now);
        let receipt = self.publisher.publish(&report, &ctx).await?;

        self.store.save(&checkpoints).await?;

        info!(
            batch = batch_ids.len(),
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            rows = report.total_rows(),
            notified = receipt.notified,
            "Run complete"
        );

        Ok(RunOutcome::Completed(RunSummary {
            batch: batch_ids,
            total_rows: report.total_rows(),
            succeeded: report.succeeded,
            failed: report.failed,
            notified: receipt.notified,
            document: receipt.document,
        }))
    }
}
