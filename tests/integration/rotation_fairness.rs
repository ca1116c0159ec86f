//! Every live account is scanned within ceil(N / B) runs

use budget_pacing_monitor::report::csv::CsvReportPublisher;
use budget_pacing_monitor::resume::{AccountCheckpoint, CheckpointList, CheckpointStore, LocalBlobStore};
use budget_pacing_monitor::scheduler::{reconcile, BatchScheduler, MonitorRun, RunOptions, RunOutcome};
use budget_pacing_monitor::source::JsonFileEntitySource;
use chrono::{Duration, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

fn fixture(accounts: usize) -> String {
    let entries: Vec<String> = (1..=accounts)
        .map(|i| {
            format!(
                r#"{{ "id": "{i}", "customerId": "9", "accountNumber": "X{i}", "name": "Account {i}", "impressionsLast7Days": 5 }}"#
            )
        })
        .collect();
    format!(r#"{{ "accounts": [{}] }}"#, entries.join(","))
}

fn monitor(temp: &TempDir, accounts: usize, batch_size: usize) -> MonitorRun<LocalBlobStore> {
    MonitorRun::new(
        Arc::new(JsonFileEntitySource::from_json(&fixture(accounts)).unwrap()),
        CheckpointStore::new(LocalBlobStore::new(temp.path().join("state")), "accounts.json"),
        Arc::new(CsvReportPublisher::new(temp.path().join("out"))),
        BatchScheduler::new(batch_size).unwrap(),
        RunOptions {
            new_document_each_run: false,
            ..RunOptions::default()
        },
    )
}

fn batch(outcome: RunOutcome) -> Vec<String> {
    match outcome {
        RunOutcome::Completed(summary) => summary.batch,
        other => panic!("run did not complete: {other:?}"),
    }
}

#[tokio::test]
async fn test_all_accounts_covered_within_ceil_runs() {
    let temp = TempDir::new().unwrap();
    let (accounts, batch_size) = (7, 3);
    let run = monitor(&temp, accounts, batch_size);
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

    let runs = accounts.div_ceil(batch_size);
    let mut seen = HashSet::new();
    let mut batches = Vec::new();
    for i in 0..runs {
        let ids = batch(run.execute_at(start + Duration::minutes(15 * i as i64)).await.unwrap());
        assert!(ids.len() <= batch_size);
        seen.extend(ids.iter().cloned());
        batches.push(ids);
    }

    assert_eq!(seen.len(), accounts);
    // no account repeats before everyone had a turn
    assert!(batches[0].iter().all(|id| !batches[1].contains(id)));
    assert_eq!(batches[0], vec!["1", "2", "3"]);
    assert_eq!(batches[2], vec!["7", "1", "2"]);
}

#[tokio::test]
async fn test_new_account_jumps_the_queue() {
    let temp = TempDir::new().unwrap();
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

    batch(monitor(&temp, 4, 2).execute_at(start).await.unwrap());
    batch(monitor(&temp, 4, 2).execute_at(start + Duration::hours(1)).await.unwrap());

    let ids = batch(monitor(&temp, 5, 2).execute_at(start + Duration::hours(2)).await.unwrap());
    assert_eq!(ids, vec!["5", "1"]);
}

#[tokio::test]
async fn test_removed_accounts_drop_out() {
    let temp = TempDir::new().unwrap();
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

    batch(monitor(&temp, 4, 4).execute_at(start).await.unwrap());
    batch(monitor(&temp, 2, 4).execute_at(start + Duration::hours(1)).await.unwrap());

    let store = CheckpointStore::new(LocalBlobStore::new(temp.path().join("state")), "accounts.json");
    let ids: HashSet<String> = store.load().await.unwrap().ids().into_iter().collect();
    assert_eq!(ids, HashSet::from(["1".to_string(), "2".to_string()]));
}

#[tokio::test]
async fn test_reconcile_and_save_twice_is_byte_identical() {
    let temp = TempDir::new().unwrap();
    let blobs = LocalBlobStore::new(temp.path());
    let store = CheckpointStore::new(blobs.clone(), "accounts.json");
    let live: Vec<String> = ["3", "1", "4", "2"].iter().map(|s| s.to_string()).collect();

    // a stored list with checked accounts, a tie and a never-checked one
    let seeded = CheckpointList::from(vec![
        AccountCheckpoint {
            id: "1".to_string(),
            last_checked: "2024-05-01T00:00:00.000Z".to_string(),
        },
        AccountCheckpoint {
            id: "2".to_string(),
            last_checked: "2024-05-01T00:00:00.000Z".to_string(),
        },
        AccountCheckpoint::unchecked("3"),
    ]);
    store.save(&seeded).await.unwrap();

    store.save(&reconcile(store.load().await.unwrap(), &live)).await.unwrap();
    let first = std::fs::read(blobs.path_for("accounts.json")).unwrap();

    store.save(&reconcile(store.load().await.unwrap(), &live)).await.unwrap();
    let second = std::fs::read(blobs.path_for("accounts.json")).unwrap();

    assert_eq!(first, second);
    assert_eq!(store.load().await.unwrap().ids(), vec!["3", "4", "1", "2"]);
}
