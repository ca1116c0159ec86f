//! Account checkpoint records
//!
//! One record per account: its id and when it was last scanned successfully.
//! `lastChecked` is empty until the first successful scan; otherwise it is a
//! fixed-width UTC timestamp so plain string comparison orders records by age.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format of `lastChecked` values; fixed width so lexicographic order is chronological
pub const CHECKPOINT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Format a checkpoint timestamp
pub fn checkpoint_timestamp(at: DateTime<Utc>) -> String {
    at.format(CHECKPOINT_TIMESTAMP_FORMAT).to_string()
}

/// When an account was last scanned successfully
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCheckpoint {
    /// Stable account identifier
    pub id: String,
    /// Timestamp of the last successful scan, empty if never scanned
    #[serde(default)]
    pub last_checked: String,
}

impl AccountCheckpoint {
    /// Record for an account that has never been scanned
    pub fn unchecked(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            last_checked: String::new(),
        }
    }

    /// Whether the account has never been scanned successfully
    pub fn is_unchecked(&self) -> bool {
        self.last_checked.is_empty()
    }

    /// Advance the record to `timestamp`
    pub fn mark_checked(&mut self, timestamp: impl Into<String>) {
        self.last_checked = timestamp.into();
    }
}

/// Ordered checkpoint records, persisted as one JSON array
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckpointList(Vec<AccountCheckpoint>);

impl CheckpointList {
    /// Empty list
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list has no records
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Records in their current order
    pub fn iter(&self) -> impl Iterator<Item = &AccountCheckpoint> {
        self.0.iter()
    }

    /// Record for `id`
    pub fn get(&self, id: &str) -> Option<&AccountCheckpoint> {
        self.0.iter().find(|c| c.id == id)
    }

    /// Mutable record for `id`
    pub fn get_mut(&mut self, id: &str) -> Option<&mut AccountCheckpoint> {
        self.0.iter_mut().find(|c| c.id == id)
    }

    /// Whether a record exists for `id`
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Append a record
    pub fn push(&mut self, checkpoint: AccountCheckpoint) {
        self.0.push(checkpoint);
    }

    /// Keep only the records matching `keep`
    pub fn retain(&mut self, keep: impl FnMut(&AccountCheckpoint) -> bool) {
        self.0.retain(keep);
    }

    /// Stable sort, oldest `lastChecked` first; never-scanned records lead
    pub fn sort_oldest_first(&mut self) {
        self.0.sort_by(|a, b| a.last_checked.cmp(&b.last_checked));
    }

    /// First `n` records
    pub fn head(&self, n: usize) -> &[AccountCheckpoint] {
        &self.0[..n.min(self.0.len())]
    }

    /// Account ids in order
    pub fn ids(&self) -> Vec<String> {
        self.0.iter().map(|c| c.id.clone()).collect()
    }
}

impl From<Vec<AccountCheckpoint>> for CheckpointList {
    fn from(records: Vec<AccountCheckpoint>) -> Self {
        Self(records)
    }
}

impl IntoIterator for CheckpointList {
    type Item = AccountCheckpoint;
    type IntoIter = std::vec::IntoIter<AccountCheckpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
