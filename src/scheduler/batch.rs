//! Batch rotation
//!
//! Each run reconciles the stored checkpoints with the live account list,
//! sorts them oldest-scanned first, persists the result and hands the head of
//! the list to the run. Because only successful scans advance a checkpoint,
//! every live account is visited within `ceil(live / batch_size)` runs of a
//! stable population.

use std::collections::HashSet;
use tracing::{debug, info};

use super::{SchedulerError, SchedulerResult};
use crate::resume::{AccountCheckpoint, BlobStore, CheckpointList, CheckpointStore};

/// Accounts selected for one run
#[derive(Debug, Clone)]
pub struct Batch {
    /// Checkpoint snapshots of the selected accounts, oldest first
    pub selected: Vec<AccountCheckpoint>,
    /// Full reconciled list as persisted
    pub checkpoints: CheckpointList,
}

impl Batch {
    /// Ids of the selected accounts
    pub fn account_ids(&self) -> Vec<String> {
        self.selected.iter().map(|c| c.id.clone()).collect()
    }

    /// Whether nothing was selected
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Picks the next bounded subset of accounts to scan
#[derive(Debug, Clone, Copy)]
pub struct BatchScheduler {
    batch_size: usize,
}

impl BatchScheduler {
    /// Scheduler selecting at most `batch_size` accounts per run
    pub fn new(batch_size: usize) -> SchedulerResult<Self> {
        if batch_size == 0 {
            return Err(SchedulerError::InvalidBatchSize(batch_size));
        }
        Ok(Self { batch_size })
    }

    /// Maximum accounts per run
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Load, reconcile, sort and persist the checkpoint list, then select the batch
    ///
    /// The reconciled list is written before the batch is returned; a failed
    /// write aborts the run without selecting anything.
    pub async fn next_batch<B: BlobStore>(
        &self,
        store: &CheckpointStore<B>,
        live_account_ids: &[String],
    ) -> SchedulerResult<Batch> {
        let stored = store.load().await?;
        let stored_len = stored.len();

        let checkpoints = reconcile(stored, live_account_ids);
        store.save(&checkpoints).await?;

        let selected = checkpoints.head(self.batch_size).to_vec();

        info!(
            live = live_account_ids.len(),
            stored = stored_len,
            reconciled = checkpoints.len(),
            selected = selected.len(),
            "Selected account batch"
        );

        Ok(Batch { selected, checkpoints })
    }
}

/// Add unseen live accounts, drop accounts no longer live, sort oldest first
///
/// Duplicate ids collapse to their first occurrence.
pub fn reconcile(mut list: CheckpointList, live_account_ids: &[String]) -> CheckpointList {
    let mut seen: HashSet<String> = HashSet::with_capacity(list.len());
    list.retain(|c| seen.insert(c.id.clone()));

    let mut added = 0usize;
    for id in live_account_ids {
        if seen.insert(id.clone()) {
            list.push(AccountCheckpoint::unchecked(id.clone()));
            added += 1;
        }
    }

    let live: HashSet<&str> = live_account_ids.iter().map(String::as_str).collect();
    let before = list.len();
    list.retain(|c| live.contains(c.id.as_str()));

    debug!(added, removed = before - list.len(), "Reconciled checkpoint list");

    list.sort_oldest_first();
    list
}
