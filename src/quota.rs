//! Outbound call quota
//!
//! The host limits how many URL fetches a run may make per day. A
//! [`CallBudget`] hands out one permit per outbound call and never returns
//! them, so `remaining()` is the quota left for the rest of the run. Runs
//! check the budget up front and abort before touching any account when it
//! is too low.
//!
//! The daily quota outlives a single process: [`DailyQuotaLedger`] stores the
//! calls made so far on the current UTC day and starts each run's budget
//! from what is left.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::resume::{BlobStore, ResumeError, ResumeResult};

/// Minimum remaining quota required to start a run
pub const MIN_REMAINING_QUOTA: usize = 50;

/// Source of the remaining daily call quota
pub trait QuotaSource: Send + Sync {
    /// Calls still available today
    fn remaining_daily_quota(&self) -> usize;
}

/// Call budget backed by a semaphore whose permits are consumed, not released
#[derive(Clone, Debug)]
pub struct CallBudget {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl CallBudget {
    /// Create a budget of `limit` calls
    pub fn new(limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Total calls this budget started with
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Calls still available
    pub fn remaining(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Consume `calls` permits without blocking
    ///
    /// # Errors
    /// [`QuotaError::Exhausted`] when fewer than `calls` permits remain.
    pub fn consume(&self, calls: u32) -> Result<(), QuotaError> {
        let permit = self
            .semaphore
            .try_acquire_many(calls)
            .map_err(|_| QuotaError::Exhausted {
                requested: calls as usize,
                remaining: self.remaining(),
            })?;
        permit.forget();
        debug!(consumed = calls, remaining = self.remaining(), "Call quota consumed");
        Ok(())
    }
}

impl QuotaSource for CallBudget {
    fn remaining_daily_quota(&self) -> usize {
        self.remaining()
    }
}

/// Calls made on one UTC day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsage {
    /// Day the calls were made on
    pub date: NaiveDate,
    /// Calls made that day
    pub used: usize,
}

/// Daily call quota carried across runs through a blob store
///
/// Usage from an earlier day is discarded, so the quota resets at UTC midnight.
pub struct DailyQuotaLedger<B> {
    blobs: B,
    name: String,
    date: NaiveDate,
    used_before: usize,
    budget: CallBudget,
}

impl<B: BlobStore> DailyQuotaLedger<B> {
    /// Load today's usage and size the run's budget to what is left of `daily_limit`
    pub async fn load(blobs: B, name: impl Into<String>, daily_limit: usize, today: NaiveDate) -> ResumeResult<Self> {
        let name = name.into();
        let stored = match blobs.read(&name).await? {
            Some(text) if !text.trim().is_empty() => {
                Some(serde_json::from_str::<DailyUsage>(text.trim()).map_err(|e| {
                    warn!(error = %e, name = %name, "Failed to deserialize quota usage");
                    ResumeError::DeserializationError(e.to_string())
                })?)
            }
            _ => None,
        };

        let used_before = match stored {
            Some(usage) if usage.date == today => usage.used,
            _ => 0,
        };
        let budget = CallBudget::new(daily_limit.saturating_sub(used_before));
        info!(%today, used_before, remaining = budget.remaining(), "Loaded daily call quota");

        Ok(Self {
            blobs,
            name,
            date: today,
            used_before,
            budget,
        })
    }

    /// Budget for this run; clones share its permits
    pub fn budget(&self) -> &CallBudget {
        &self.budget
    }

    /// Calls made today, this run included
    pub fn used_today(&self) -> usize {
        self.used_before + self.budget.limit() - self.budget.remaining()
    }

    /// Persist today's usage; a run that made no calls writes nothing
    pub async fn save(&self) -> ResumeResult<()> {
        if self.budget.remaining() == self.budget.limit() {
            return Ok(());
        }
        let usage = DailyUsage {
            date: self.date,
            used: self.used_today(),
        };
        let json = serde_json::to_string(&usage).map_err(|e| ResumeError::SerializationError(e.to_string()))?;
        self.blobs.write(&self.name, &json).await?;
        debug!(date = %usage.date, used = usage.used, "Saved daily call quota");
        Ok(())
    }
}

/// Check that at least `required` calls remain
///
/// Returns the remaining quota on success.
pub fn precheck(source: &dyn QuotaSource, required: usize) -> Result<usize, QuotaError> {
    let remaining = source.remaining_daily_quota();
    if remaining < required {
        return Err(QuotaError::Insufficient { remaining, required });
    }
    Ok(remaining)
}

/// Quota errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuotaError {
    /// Not enough quota to start a run
    #[error("remaining URL fetch quota {remaining} is not enough to run now (need {required})")]
    Insufficient {
        /// Calls remaining
        remaining: usize,
        /// Calls required
        required: usize,
    },

    /// A call was attempted after the budget ran out
    #[error("requested {requested} call(s) but only {remaining} remain")]
    Exhausted {
        /// Calls requested
        requested: usize,
        /// Calls remaining
        remaining: usize,
    },
}
