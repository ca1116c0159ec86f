//! Bounded parallel fan-out over a batch of accounts
//!
//! Each account runs on its own tokio task so a panic stays inside that task.
//! At most `max_concurrency` tasks are in flight. The caller sees nothing
//! until every task has settled, then receives one [`AccountOutcome`] per
//! work unit, in batch order.

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Instrument};

use crate::metrics::AccountScanMetrics;
use crate::resume::AccountCheckpoint;

/// Per-account scan time limit, matching the host's per-account execution cap
pub const DEFAULT_ACCOUNT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// One account's share of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    /// Account to scan
    pub account_id: String,
    /// Checkpoint snapshot taken when the batch was selected
    pub checkpoint: AccountCheckpoint,
}

impl From<AccountCheckpoint> for WorkUnit {
    fn from(checkpoint: AccountCheckpoint) -> Self {
        Self {
            account_id: checkpoint.id.clone(),
            checkpoint,
        }
    }
}

/// Scans a single account
#[async_trait]
pub trait AccountHandler: Send + Sync + 'static {
    /// Serializable result of a successful scan
    type Output: Serialize + Send + 'static;
    /// Failure of a single scan
    type Error: Display + Send + 'static;

    /// Scan the account described by `unit`
    async fn process(&self, unit: WorkUnit) -> Result<Self::Output, Self::Error>;
}

/// Settled result of one account task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountOutcome {
    /// Scan succeeded; `payload` is the serialized handler output
    Succeeded {
        /// Account id
        account_id: String,
        /// JSON-serialized handler output
        payload: String,
    },
    /// Scan failed, timed out or panicked
    Failed {
        /// Account id
        account_id: String,
        /// Failure description
        error: String,
    },
}

impl AccountOutcome {
    /// Account this outcome belongs to
    pub fn account_id(&self) -> &str {
        match self {
            AccountOutcome::Succeeded { account_id, .. } | AccountOutcome::Failed { account_id, .. } => account_id,
        }
    }

    /// Whether the scan succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, AccountOutcome::Succeeded { .. })
    }
}

/// Runs a handler over a batch with bounded concurrency
#[derive(Debug, Clone, Copy)]
pub struct ParallelCoordinator {
    max_concurrency: usize,
    account_timeout: Option<Duration>,
}

impl ParallelCoordinator {
    /// Coordinator running at most `max_concurrency` accounts at once
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            account_timeout: Some(DEFAULT_ACCOUNT_TIMEOUT),
        }
    }

    /// Override the per-account time limit; `None` waits indefinitely
    pub fn with_account_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.account_timeout = timeout;
        self
    }

    /// Maximum concurrent accounts
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Run `handler` once per unit and collect every outcome
    ///
    /// Never fails as a whole: each account's failure is reported in its own
    /// outcome.
    pub async fn run<H: AccountHandler>(&self, handler: Arc<H>, units: Vec<WorkUnit>) -> Vec<AccountOutcome> {
        info!(
            accounts = units.len(),
            concurrency = self.max_concurrency,
            "Fanning out account scans"
        );

        let timeout = self.account_timeout;
        let mut settled: Vec<(usize, AccountOutcome)> = stream::iter(units.into_iter().enumerate())
            .map(|(index, unit)| {
                let handler = handler.clone();
                async move { (index, run_one(handler, unit, timeout).await) }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        settled.sort_by_key(|(index, _)| *index);
        let outcomes: Vec<AccountOutcome> = settled.into_iter().map(|(_, outcome)| outcome).collect();

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            succeeded = outcomes.len() - failed,
            failed,
            "All account scans settled"
        );

        outcomes
    }
}

async fn run_one<H: AccountHandler>(handler: Arc<H>, unit: WorkUnit, timeout: Option<Duration>) -> AccountOutcome {
    let account_id = unit.account_id.clone();
    let metrics = AccountScanMetrics::start(&account_id);
    let span = tracing::info_span!("account_scan", account_id = %account_id);

    let task = tokio::spawn(async move { handler.process(unit).await }.instrument(span));
    let abort = task.abort_handle();

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            Err(_) => {
                abort.abort();
                let error = format!("timed out after {}s", limit.as_secs());
                metrics.record_failure(&error);
                return AccountOutcome::Failed { account_id, error };
            }
        },
        None => task.await,
    };

    let result = match joined {
        Ok(Ok(output)) => serde_json::to_string(&output).map_err(|e| format!("failed to serialize result: {e}")),
        Ok(Err(e)) => Err(e.to_string()),
        Err(join_error) if join_error.is_panic() => Err("task panicked".to_string()),
        Err(join_error) => Err(format!("task cancelled: {join_error}")),
    };

    match result {
        Ok(payload) => {
            metrics.record_success();
            AccountOutcome::Succeeded { account_id, payload }
        }
        Err(error) => {
            warn!(account_id = %account_id, error = %error, "Account produced no result this run");
            metrics.record_failure(&error);
            AccountOutcome::Failed { account_id, error }
        }
    }
}
