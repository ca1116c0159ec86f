//! Call quota spent by one run is still spent for the next run that day

use crate::common::google_fake::GoogleFake;
use budget_pacing_monitor::discovery::{shared_resources::global_http_client, Credentials, ServiceBuilder, TokenProvider};
use budget_pacing_monitor::google::{GoogleReportPublisher, GoogleServices};
use budget_pacing_monitor::quota::{DailyQuotaLedger, MIN_REMAINING_QUOTA};
use budget_pacing_monitor::resume::{CheckpointStore, LocalBlobStore};
use budget_pacing_monitor::scheduler::{BatchScheduler, MonitorRun, RunOptions, RunOutcome};
use budget_pacing_monitor::source::JsonFileEntitySource;
use chrono::NaiveDate;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const DAILY_LIMIT: usize = 60;
const LEDGER: &str = "quota.json";

const FIXTURE: &str = r#"{ "accounts": [
    { "id": "1", "customerId": "9", "accountNumber": "X1", "name": "Acme", "impressionsLast7Days": 10,
      "campaigns": [ { "id": "c1", "name": "Brand", "budgetAmount": 100, "spendToday": 95, "impressions": 40, "clicks": 3 } ] }
] }"#;

async fn ledger(state: &Path, today: NaiveDate) -> DailyQuotaLedger<LocalBlobStore> {
    DailyQuotaLedger::load(LocalBlobStore::new(state), LEDGER, DAILY_LIMIT, today)
        .await
        .unwrap()
}

fn monitor(fake: &GoogleFake, state: &Path, ledger: &DailyQuotaLedger<LocalBlobStore>) -> MonitorRun<LocalBlobStore> {
    let budget = ledger.budget().clone();
    let builder = ServiceBuilder::new()
        .with_call_budget(budget.clone())
        .with_token_provider(TokenProvider::new(
            global_http_client(),
            format!("{}/token", fake.server.url()),
        ));
    let services = Arc::new(GoogleServices::new(
        builder,
        Credentials::with_refresh_token("id", "secret", "refresh"),
        fake.discovery_urls(),
    ));

    MonitorRun::new(
        Arc::new(JsonFileEntitySource::from_json(FIXTURE).unwrap()),
        CheckpointStore::new(LocalBlobStore::new(state), "accounts.json"),
        Arc::new(GoogleReportPublisher::new(services)),
        BatchScheduler::new(10).unwrap(),
        RunOptions {
            threshold: 80,
            recipients: vec!["a@example.com".to_string(), "b@example.com".to_string()],
            ..RunOptions::default()
        },
    )
    .with_quota(Arc::new(budget))
}

#[tokio::test]
async fn test_second_run_same_day_is_refused() {
    let fake = GoogleFake::start().await;
    let temp = TempDir::new().unwrap();
    let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();

    let first = ledger(temp.path(), today).await;
    let outcome = monitor(&fake, temp.path(), &first).execute().await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed(ref s) if s.notified));
    // three discovery fetches plus the Drive, Sheets and Gmail calls
    assert!(first.used_today() > DAILY_LIMIT - MIN_REMAINING_QUOTA);
    first.save().await.unwrap();

    let calls_after_first = fake.server.requests().len();
    let second = ledger(temp.path(), today).await;
    let outcome = monitor(&fake, temp.path(), &second).execute().await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::QuotaExhausted {
            remaining: DAILY_LIMIT - first.used_today()
        }
    );
    assert_eq!(fake.server.requests().len(), calls_after_first);
}

#[tokio::test]
async fn test_next_day_runs_again() {
    let fake = GoogleFake::start().await;
    let temp = TempDir::new().unwrap();
    let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();

    let first = ledger(temp.path(), today).await;
    monitor(&fake, temp.path(), &first).execute().await.unwrap();
    first.save().await.unwrap();

    let tomorrow = ledger(temp.path(), today.succ_opt().unwrap()).await;
    let outcome = monitor(&fake, temp.path(), &tomorrow).execute().await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed(_)));
}
