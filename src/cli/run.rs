//! Run command and top-level argument parsing

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use super::{checkpoint_store, google_services, load_config, quota_ledger, CliError, OperationsArgs};
use crate::config::PublisherKind;
use crate::google::GoogleReportPublisher;
use crate::report::csv::CsvReportPublisher;
use crate::report::ReportPublisher;
use crate::scheduler::{BatchScheduler, MonitorRun, ParallelCoordinator, RunOptions, RunOutcome};
use crate::source::JsonFileEntitySource;

/// Budget pacing monitor CLI
#[derive(Parser, Debug)]
#[command(name = "budget-pacing-monitor")]
#[command(about = "Flag campaigns whose spend is pacing past their daily budget", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// TOML config file; defaults are used when omitted
    #[arg(long, global = true, env = "BUDGET_MONITOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Serve Prometheus metrics on this address
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one scheduling pass over the next batch of accounts
    Run(RunArgs),

    /// Show the stored account rotation
    Status,

    /// List the operations of a discovery document
    Operations(OperationsArgs),
}

/// Run command arguments
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Accounts per run (overrides the config)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: Option<u64>,

    /// Report destination (overrides the config)
    #[arg(long, value_enum)]
    pub publisher: Option<PublisherKind>,
}

impl RunArgs {
    /// Execute one run
    pub async fn execute(&self, cli: &Cli) -> Result<RunOutcome, CliError> {
        let mut config = load_config(cli.config.as_deref())?;
        if let Some(batch_size) = self.batch_size {
            config.account_batch_size = usize::try_from(batch_size)
                .map_err(|_| CliError::InvalidArgument(format!("batch size {batch_size} too large")))?;
        }
        if let Some(publisher) = self.publisher {
            config.publisher = publisher;
        }
        config.validate()?;

        let ledger = quota_ledger(&config).await?;
        let budget = ledger.budget().clone();
        let services = google_services(&config, &budget);
        let source = JsonFileEntitySource::load(&config.entity_source).await?;

        let publisher: Arc<dyn ReportPublisher> = match config.publisher {
            PublisherKind::Google => Arc::new(GoogleReportPublisher::new(services.clone())),
            PublisherKind::Csv => Arc::new(CsvReportPublisher::new(&config.output_dir)),
        };

        let scheduler = BatchScheduler::new(config.account_batch_size)?;
        let coordinator =
            ParallelCoordinator::new(config.account_batch_size).with_account_timeout(config.account_timeout());

        let run = MonitorRun::new(
            Arc::new(source),
            checkpoint_store(&config, &services),
            publisher,
            scheduler,
            RunOptions::from_config(&config)?,
        )
        .with_quota(Arc::new(budget))
        .with_coordinator(coordinator)
        .with_combined_report(config.combine_all_accounts);

        let outcome = run.execute().await;
        if let Err(e) = ledger.save().await {
            warn!(error = %e, used = ledger.used_today(), "Failed to record call quota usage");
        }
        let outcome = outcome?;
        match &outcome {
            RunOutcome::QuotaExhausted { remaining } => {
                warn!(remaining, "Run skipped: call quota too low");
            }
            RunOutcome::Completed(summary) => {
                info!(
                    batch = summary.batch.len(),
                    succeeded = summary.succeeded.len(),
                    failed = summary.failed.len(),
                    rows = summary.total_rows,
                    notified = summary.notified,
                    document = summary.document.as_deref().unwrap_or("-"),
                    "Run finished"
                );
            }
        }
        Ok(outcome)
    }
}
