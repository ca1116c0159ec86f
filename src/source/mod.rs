//! Advertising entities the monitor scans
//!
//! The host platform enumerates accounts and campaigns. [`EntitySource`] is
//! the seam for that: a live enumeration of accounts that passed the host's
//! activity filter, and per-account campaign lists with today's stats.
//! [`JsonFileEntitySource`] reads both from a JSON fixture.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

pub mod pacing;

pub use pacing::{pacing_percent, PacingScanner};

/// Entity source errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Account id not known to the source
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// Source data unreadable
    #[error("IO error: {0}")]
    IoError(String),

    /// Source data malformed
    #[error("parse error: {0}")]
    ParseError(String),

    /// Host-side failure while reading an account
    #[error("account {account_id} unavailable: {reason}")]
    Unavailable {
        /// Account id
        account_id: String,
        /// Failure reason
        reason: String,
    },
}

/// Result type for entity reads
pub type SourceResult<T> = Result<T, SourceError>;

/// Advertising account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Account id
    pub id: String,
    /// Owning customer id
    pub customer_id: String,
    /// Human-facing account number
    pub account_number: String,
    /// Account name
    pub name: String,
}

/// Campaign with today's spend and stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    /// Campaign id
    pub id: String,
    /// Campaign name
    pub name: String,
    /// Daily budget amount
    pub budget_amount: Decimal,
    /// Spend so far today
    pub spend_today: Decimal,
    /// Impressions today
    #[serde(default)]
    pub impressions: u64,
    /// Clicks today
    #[serde(default)]
    pub clicks: u64,
}

/// Finite, restartable cursor over entities
#[derive(Debug, Clone)]
pub struct EntityCursor<T> {
    items: Vec<T>,
    position: usize,
}

impl<T: Clone> EntityCursor<T> {
    /// Cursor positioned before the first item
    pub fn new(items: Vec<T>) -> Self {
        Self { items, position: 0 }
    }

    /// Total entities, independent of position
    pub fn total_count(&self) -> usize {
        self.items.len()
    }

    /// Whether another entity is available
    pub fn has_next(&self) -> bool {
        self.position < self.items.len()
    }

    /// Rewind to the first entity
    pub fn restart(&mut self) {
        self.position = 0;
    }
}

impl<T: Clone> Iterator for EntityCursor<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let item = self.items.get(self.position).cloned()?;
        self.position += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.items.len() - self.position;
        (left, Some(left))
    }
}

/// Enumerates accounts and their campaigns
#[async_trait]
pub trait EntitySource: Send + Sync {
    /// Accounts with at least one impression in the last 7 days
    async fn accounts(&self) -> SourceResult<EntityCursor<Account>>;

    /// Look up a single account
    async fn account(&self, account_id: &str) -> SourceResult<Account>;

    /// The account's campaigns with at least one click today
    async fn campaigns(&self, account_id: &str) -> SourceResult<EntityCursor<Campaign>>;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureAccount {
    #[serde(flatten)]
    account: Account,
    #[serde(default)]
    impressions_last_7_days: u64,
    #[serde(default)]
    campaigns: Vec<Campaign>,
}

#[derive(Debug, Clone, Deserialize)]
struct Fixture {
    #[serde(default)]
    accounts: Vec<FixtureAccount>,
}

/// Entity source backed by a JSON fixture
///
/// ```json
/// { "accounts": [ { "id": "1", "customerId": "9", "accountNumber": "X1", "name": "Acme",
///                   "impressionsLast7Days": 10,
///                   "campaigns": [ { "id": "c1", "name": "Brand", "budgetAmount": 100,
///                                    "spendToday": 95, "impressions": 40, "clicks": 3 } ] } ] }
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileEntitySource {
    accounts: Vec<FixtureAccount>,
}

impl JsonFileEntitySource {
    /// Parse a fixture document
    pub fn from_json(text: &str) -> SourceResult<Self> {
        let fixture: Fixture = serde_json::from_str(text).map_err(|e| SourceError::ParseError(e.to_string()))?;
        debug!(accounts = fixture.accounts.len(), "Loaded entity fixture");
        Ok(Self {
            accounts: fixture.accounts,
        })
    }

    /// Read and parse a fixture file
    pub async fn load(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SourceError::IoError(format!("{}: {e}", path.display())))?;
        let source = Self::from_json(&text)?;
        info!(path = %path.display(), accounts = source.accounts.len(), "Entity source ready");
        Ok(source)
    }

    fn find(&self, account_id: &str) -> SourceResult<&FixtureAccount> {
        self.accounts
            .iter()
            .find(|a| a.account.id == account_id)
            .ok_or_else(|| SourceError::AccountNotFound(account_id.to_string()))
    }
}

#[async_trait]
impl EntitySource for JsonFileEntitySource {
    async fn accounts(&self) -> SourceResult<EntityCursor<Account>> {
        let live = self
            .accounts
            .iter()
            .filter(|a| a.impressions_last_7_days >= 1)
            .map(|a| a.account.clone())
            .collect();
        Ok(EntityCursor::new(live))
    }

    async fn account(&self, account_id: &str) -> SourceResult<Account> {
        Ok(self.find(account_id)?.account.clone())
    }

    async fn campaigns(&self, account_id: &str) -> SourceResult<EntityCursor<Campaign>> {
        let clicked = self
            .find(account_id)?
            .campaigns
            .iter()
            .filter(|c| c.clicks >= 1)
            .cloned()
            .collect();
        Ok(EntityCursor::new(clicked))
    }
}
